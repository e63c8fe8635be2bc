//! URL resolution subsystem.
//!
//! # Data Flow
//! ```text
//! page URL (full, network-absolute, root-relative or bare)
//!     → path.rs (normalize, extract path, join with page files prefix)
//!     → resolver.rs (apply default-document variation)
//!     → content path, or PageNotFound once variations are exhausted
//! ```
//!
//! # Design Decisions
//! - Pure functions of (url, location, options); no I/O
//! - Variation counter is bounded so retries always terminate

pub mod path;
pub mod resolver;

pub use resolver::{PathResolver, ResolutionOptions};
