//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! route(url)
//!     → matcher.rs (first redirect rule matching the page path)
//!     → 301/302: loop on the destination
//!     → PASSTHRU: bridge handshake or embedded frame
//!     → otherwise: content loader → page renderer
//!     → history.rs (push state), hooks.rs (client callbacks)
//! ```
//!
//! # Design Decisions
//! - Redirect rules compiled once per listing load
//! - First match wins, in listing order
//! - Client behaviour is customized through `ClientHooks`, not by replacing
//!   router methods

pub mod history;
pub mod hooks;
pub mod matcher;
pub mod router;

pub use history::History;
pub use hooks::{ClientHooks, DefaultHooks};
pub use matcher::{MatchType, Redirect, RedirectCode, RedirectMatch, RedirectMatcher};
pub use router::{ClickOutcome, RouteOptions, RouteOutcome, Router};
