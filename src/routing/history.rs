//! History entries and pop-state binding.

use std::cell::Cell;

use crate::host::Host;
use crate::routing::hooks::ClientHooks;

/// Tracks whether pop-state routing is bound. Binding happens once and is
/// never undone.
#[derive(Debug, Default)]
pub struct History {
    pop_state_bound: Cell<bool>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_pop_state(&self) {
        if !self.pop_state_bound.replace(true) {
            tracing::debug!("Pop-state routing bound");
        }
    }

    pub fn is_pop_state_bound(&self) -> bool {
        self.pop_state_bound.get()
    }

    /// Record `url` as a new history entry, unless the save-state hook
    /// vetoes it.
    pub fn push(
        &self,
        host: &dyn Host,
        hooks: &dyn ClientHooks,
        url: &str,
        title: &str,
        bind_routing_events: bool,
    ) -> bool {
        if bind_routing_events {
            self.bind_pop_state();
        }
        if !hooks.on_save_state(url) {
            tracing::debug!(url, "History push vetoed");
            return false;
        }
        host.push_state(url, title);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;
    use crate::routing::hooks::DefaultHooks;
    use url::Url;

    struct NoSave;

    impl ClientHooks for NoSave {
        fn on_save_state(&self, _url: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_push() {
        let host = HeadlessHost::new(Url::parse("https://site.test/").unwrap());
        let history = History::new();

        assert!(history.push(&host, &DefaultHooks, "/a", "A", true));
        assert!(history.is_pop_state_bound());
        assert_eq!(host.history().len(), 1);

        assert!(!history.push(&host, &NoSave, "/b", "B", true));
        assert_eq!(host.history().len(), 1);
    }

    #[test]
    fn test_push_without_routing_events_leaves_pop_state_unbound() {
        let host = HeadlessHost::new(Url::parse("https://site.test/").unwrap());
        let history = History::new();
        history.push(&host, &DefaultHooks, "/a", "A", false);
        assert!(!history.is_pop_state_bound());
    }
}
