//! Overridable client callbacks.
//!
//! Every hook has a default. Hooks returning `bool` can veto the default
//! behaviour by returning `false`. Hooks may run while the document is being
//! updated and must not borrow it.

use crate::content::PageData;
use crate::error::CmsError;

pub trait ClientHooks {
    /// A public entry point failed.
    fn on_error(&self, error: &CmsError) {
        tracing::error!(kind = error.kind(), error = %error, "CMS client error");
    }

    /// Page rendered when a route has no content. `None` renders nothing.
    fn on_route_not_found(&self, _url: &str) -> Option<PageData> {
        Some(PageData::not_found())
    }

    fn on_page_render(&self, _page: &PageData) {}

    fn on_page_rendered(&self, _page: &PageData) {}

    /// The previous page is about to be removed from the head and footer.
    fn on_page_destroy(&self) {}

    /// A bound link was clicked; `false` cancels routing.
    fn on_link_click(&self, _url: &str) -> bool {
        true
    }

    /// `false` skips the history push.
    fn on_save_state(&self, _url: &str) -> bool {
        true
    }

    /// `false` skips routing on pop-state.
    fn on_restore_state(&self, _url: &str) -> bool {
        true
    }

    fn on_set_title(&self, _title: &str) -> bool {
        true
    }

    fn on_set_meta_description(&self, _description: &str) -> bool {
        true
    }

    fn on_set_meta_keywords(&self, _keywords: &str) -> bool {
        true
    }

    fn on_set_canonical_url(&self, _url: &str) -> bool {
        true
    }
}

/// Hooks with every default behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ClientHooks for DefaultHooks {}
