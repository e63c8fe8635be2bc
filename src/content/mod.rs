//! Content loading subsystem.
//!
//! # Data Flow
//! ```text
//! page URL
//!     → resolve (content path for the current variation)
//!     → fetcher.rs (GET + JSON decode)
//!     → 404? next variation : PageData / error
//!     → loader.rs returns PageData to the router
//! ```
//!
//! # Design Decisions
//! - Transport is a trait so the router never touches the network directly
//! - 404 is the only retryable condition

pub mod fetcher;
pub mod loader;
pub mod types;

pub use fetcher::{ContentFetcher, HttpFetcher};
pub use loader::ContentLoader;
pub use types::{FetchError, PageData, Seo};
