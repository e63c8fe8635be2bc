//! Loading overlay shared by concurrent routes.
//!
//! Each route holds an [`OverlayGuard`]; the overlay stays visible while any
//! guard is alive.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::dom::Document;
use crate::render::live::{Dedup, LiveRenderEngine, Selector};

pub const OVERLAY_ID: &str = "jsHarmonyCMSClientLoading";

const OVERLAY_STYLE: &str = "background-color:rgba(255,255,255,1);position:fixed;top:0px;left:0px;\
bottom:0px;width:100%;z-index:2147483643;cursor:wait";
const SPINNER_CONTAINER_STYLE: &str = "position:absolute;top:50%;left:50%";
const SPINNER_STYLE: &str = "height:100px;width:100px;position:relative;top:-50px;left:-50px";
const SPINNER_SRC: &str = "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg' \
width='38' height='38' viewBox='0 0 38 38' stroke='%23aaa'><g fill='none' stroke-width='2'>\
<circle stroke-opacity='.5' cx='19' cy='19' r='18'/><path d='M37 19c0-9.94-8.06-18-18-18'/></g></svg>";

#[derive(Debug, Default)]
struct OverlayState {
    tokens: BTreeSet<u64>,
    next_token: u64,
    loading: bool,
}

/// Reference-counted loading overlay. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoadingOverlay {
    engine: LiveRenderEngine,
    state: Rc<RefCell<OverlayState>>,
}

impl LoadingOverlay {
    pub fn new(engine: LiveRenderEngine) -> Self {
        Self {
            engine,
            state: Rc::new(RefCell::new(OverlayState::default())),
        }
    }

    /// Show the overlay (if hidden) until the returned guard is dropped.
    pub fn start(&self) -> OverlayGuard {
        let (token, first) = {
            let mut state = self.state.borrow_mut();
            let token = state.next_token;
            state.next_token += 1;
            state.tokens.insert(token);
            let first = !state.loading;
            state.loading = true;
            (token, first)
        };
        if first {
            self.show();
        }
        OverlayGuard {
            overlay: self.clone(),
            token,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Number of live guards.
    pub fn pending(&self) -> usize {
        self.state.borrow().tokens.len()
    }

    fn stop(&self, token: u64) {
        let hide = {
            let mut state = self.state.borrow_mut();
            state.tokens.remove(&token);
            let hide = state.tokens.is_empty() && state.loading;
            if hide {
                state.loading = false;
            }
            hide
        };
        if hide {
            self.set_display("none");
        }
    }

    fn show(&self) {
        let existing = self.engine.document().borrow().get_element_by_id(OVERLAY_ID);
        if existing.is_some() {
            self.set_display("block");
            return;
        }
        self.engine.register(Selector::body(), Dedup::List, |doc, body| {
            create_overlay(doc, body);
        });
    }

    fn set_display(&self, display: &str) {
        let mut doc = self.engine.document().borrow_mut();
        if let Some(node) = doc.get_element_by_id(OVERLAY_ID) {
            doc.set_attribute(node, "style", &format!("{OVERLAY_STYLE};display:{display}"));
        }
    }
}

fn create_overlay(doc: &mut Document, body: crate::dom::NodeId) {
    let overlay = doc.create_element("div");
    doc.set_attribute(overlay, "id", OVERLAY_ID);
    doc.set_attribute(overlay, "style", &format!("{OVERLAY_STYLE};display:block"));

    let container = doc.create_element("div");
    doc.set_attribute(container, "style", SPINNER_CONTAINER_STYLE);
    let spinner = doc.create_element("img");
    doc.set_attribute(spinner, "src", SPINNER_SRC);
    doc.set_attribute(spinner, "style", SPINNER_STYLE);

    doc.append_child(container, spinner);
    doc.append_child(overlay, container);
    doc.append_child(body, overlay);
}

/// Keeps the overlay visible while alive.
#[derive(Debug)]
pub struct OverlayGuard {
    overlay: LoadingOverlay,
    token: u64,
}

impl Drop for OverlayGuard {
    fn drop(&mut self) {
        self.overlay.stop(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    fn style(doc: &Document) -> String {
        let node = doc.get_element_by_id(OVERLAY_ID).unwrap();
        doc.attribute(node, "style").unwrap().to_string()
    }

    #[tokio::test]
    async fn test_overlay_reference_counted() {
        LocalSet::new()
            .run_until(async {
                let doc = Rc::new(RefCell::new(Document::new()));
                let overlay = LoadingOverlay::new(LiveRenderEngine::new(doc.clone()));

                let first = overlay.start();
                let second = overlay.start();
                assert_eq!(overlay.pending(), 2);
                assert!(style(&doc.borrow()).ends_with("display:block"));

                drop(first);
                assert!(overlay.is_loading());
                drop(second);
                assert!(!overlay.is_loading());
                assert!(style(&doc.borrow()).ends_with("display:none"));

                let _again = overlay.start();
                assert!(style(&doc.borrow()).ends_with("display:block"));
                assert_eq!(doc.borrow().query_selector_all("#jsHarmonyCMSClientLoading").unwrap().len(), 1);
            })
            .await;
    }
}
