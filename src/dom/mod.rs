//! Document model.
//!
//! # Data Flow
//! ```text
//! renderer / router edits
//!     → document.rs (arena mutation)
//!     → DocumentEvent on every subscriber channel
//!     → live render engine re-runs reconciliation
//! ```
//!
//! # Design Decisions
//! - Nodes addressed by `NodeId` handles, never by reference
//! - Selector engine covers the binding attributes and simple containers
//! - Inserted markup is parsed into real nodes, so bindings inside it are
//!   found by later queries

pub mod document;
pub mod node;
pub mod parser;
pub mod selector;

pub use document::{Document, DocumentEvent, ReadyState, SubscriptionId};
pub use node::{ElementData, Node, NodeData, NodeId};
pub use selector::{SelectorError, SelectorList};
