//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Structured fields (path, variation, outcome) rather than formatted text
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
