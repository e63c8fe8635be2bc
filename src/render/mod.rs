//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! PageData
//!     → page.rs (head writers, trigger registration, footer)
//!     → live.rs (activation window, reconciliation per mutation batch)
//!     → bindings.rs (content, title, template, on-render actions)
//!         → expr.rs / onrender.rs (conditions and helper scripts)
//!         → defaults.rs (default markup snapshots)
//! ```
//!
//! # Design Decisions
//! - Everything runs on one thread inside a `LocalSet`
//! - Bindings are plain functions over `&mut Document`; triggers wire them up

pub mod bindings;
pub mod defaults;
pub mod expr;
pub mod live;
pub mod onrender;
pub mod overlay;
pub mod page;

pub use defaults::DefaultContentCache;
pub use expr::ExprError;
pub use live::{Dedup, LiveRenderEngine, Selector, TriggerId};
pub use overlay::{LoadingOverlay, OverlayGuard};
pub use page::{PageRenderer, RenderOptions};
