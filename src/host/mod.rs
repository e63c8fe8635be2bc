//! Host window abstraction.
//!
//! # Responsibilities
//! - Expose the current location and navigation primitives
//! - Carry cross-frame messages to the parent and the embedded proxy frame
//! - Run page scripts
//!
//! # Design Decisions
//! - Callbacks may run while the document is being updated and must not
//!   borrow it
//! - `HeadlessHost` records every call so routing decisions can be inspected

pub mod headless;
pub mod query;

use url::Url;

use crate::bridge::BridgeMessage;

pub use headless::HeadlessHost;

/// The window the router runs in.
pub trait Host {
    /// Absolute URL of the current location.
    fn current_url(&self) -> Url;

    /// Hard navigation: leave the single-page surface.
    fn navigate(&self, url: &str);

    /// Add a history entry without navigating.
    fn push_state(&self, url: &str, title: &str);

    /// Whether this window is nested in another frame.
    fn is_nested_frame(&self) -> bool;

    fn post_to_parent(&self, message: BridgeMessage);

    /// Post to the content window of the embedded passthrough frame.
    fn post_to_embedded(&self, message: BridgeMessage);

    /// Execute page script. Hosts without a script engine ignore it.
    fn execute_script(&self, source: &str) {
        tracing::debug!(bytes = source.len(), "No script engine, skipping page script");
    }
}
