//! Host without a browser: records navigation, history and messages.

use std::cell::{Cell, RefCell};

use url::Url;

use crate::bridge::BridgeMessage;
use crate::host::Host;

#[derive(Debug)]
pub struct HeadlessHost {
    location: RefCell<Url>,
    nested: Cell<bool>,
    navigations: RefCell<Vec<String>>,
    history: RefCell<Vec<(String, String)>>,
    to_parent: RefCell<Vec<BridgeMessage>>,
    to_embedded: RefCell<Vec<BridgeMessage>>,
    scripts: RefCell<Vec<String>>,
}

impl HeadlessHost {
    pub fn new(location: Url) -> Self {
        Self {
            location: RefCell::new(location),
            nested: Cell::new(false),
            navigations: RefCell::new(Vec::new()),
            history: RefCell::new(Vec::new()),
            to_parent: RefCell::new(Vec::new()),
            to_embedded: RefCell::new(Vec::new()),
            scripts: RefCell::new(Vec::new()),
        }
    }

    pub fn nested(self) -> Self {
        self.nested.set(true);
        self
    }

    pub fn set_location(&self, url: Url) {
        *self.location.borrow_mut() = url;
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }

    /// Pushed `(url, title)` entries, oldest first.
    pub fn history(&self) -> Vec<(String, String)> {
        self.history.borrow().clone()
    }

    pub fn messages_to_parent(&self) -> Vec<BridgeMessage> {
        self.to_parent.borrow().clone()
    }

    pub fn messages_to_embedded(&self) -> Vec<BridgeMessage> {
        self.to_embedded.borrow().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }

    fn relocate(&self, url: &str) {
        let joined = self.location.borrow().join(url);
        match joined {
            Ok(next) => *self.location.borrow_mut() = next,
            Err(e) => tracing::warn!(url, error = %e, "Ignoring unparsable location"),
        }
    }
}

impl Host for HeadlessHost {
    fn current_url(&self) -> Url {
        self.location.borrow().clone()
    }

    fn navigate(&self, url: &str) {
        self.navigations.borrow_mut().push(url.to_string());
        self.relocate(url);
    }

    fn push_state(&self, url: &str, title: &str) {
        self.history
            .borrow_mut()
            .push((url.to_string(), title.to_string()));
        self.relocate(url);
    }

    fn is_nested_frame(&self) -> bool {
        self.nested.get()
    }

    fn post_to_parent(&self, message: BridgeMessage) {
        self.to_parent.borrow_mut().push(message);
    }

    fn post_to_embedded(&self, message: BridgeMessage) {
        self.to_embedded.borrow_mut().push(message);
    }

    fn execute_script(&self, source: &str) {
        self.scripts.borrow_mut().push(source.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_state_moves_location() {
        let host = HeadlessHost::new(Url::parse("https://site.test/a/b").unwrap());
        host.push_state("/about", "About");
        assert_eq!(host.current_url().as_str(), "https://site.test/about");
        assert_eq!(host.history(), [("/about".to_string(), "About".to_string())]);
        assert!(host.navigations().is_empty());
    }

    #[test]
    fn test_navigate_records() {
        let host = HeadlessHost::new(Url::parse("https://site.test/").unwrap()).nested();
        assert!(host.is_nested_frame());
        host.navigate("https://other.test/x");
        assert_eq!(host.navigations(), ["https://other.test/x"]);
        assert_eq!(host.current_url().host_str(), Some("other.test"));
    }
}
