//! Client-side router and renderer for CMS-published pages.

pub mod bridge;
pub mod config;
pub mod content;
pub mod dom;
pub mod error;
pub mod host;
pub mod observability;
pub mod render;
pub mod resolve;
pub mod routing;

pub use config::ClientConfig;
pub use content::{ContentFetcher, ContentLoader, HttpFetcher, PageData};
pub use dom::Document;
pub use error::CmsError;
pub use host::{HeadlessHost, Host};
pub use routing::{ClientHooks, DefaultHooks, RouteOptions, RouteOutcome, Router};
