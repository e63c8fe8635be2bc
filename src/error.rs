//! Error definitions shared by the resolver, loader and router.

use thiserror::Error;

use crate::content::types::FetchError;

/// Errors surfaced by the routing pipeline.
#[derive(Debug, Error)]
pub enum CmsError {
    /// Every URL variation was tried without finding content.
    #[error("Page not found: {path}")]
    PageNotFound { path: String },

    /// The content response was not a page data document.
    #[error("Invalid JSON response from {content_path}")]
    InvalidContent {
        /// URL the route was asked to load.
        url: String,
        /// Content path that returned the response.
        content_path: String,
        /// Raw response body, for diagnostics.
        body: String,
    },

    /// Network or HTTP failure other than 404.
    #[error("Error loading content: {0}")]
    Transport(FetchError),

    /// The redirect listing could not be loaded.
    #[error("Error loading redirects: {0}")]
    RedirectListing(FetchError),

    /// A matched redirect carries an HTTP code the router does not know.
    #[error("Invalid redirect HTTP code: {0}")]
    RedirectConfig(String),

    /// 301/302 redirects chained past the configured limit.
    #[error("Redirect limit of {0} hops exceeded")]
    RedirectLoop(usize),

    /// The URL could not be interpreted relative to the current location.
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl CmsError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CmsError::PageNotFound { .. } => "page_not_found",
            CmsError::InvalidContent { .. } => "invalid_content",
            CmsError::Transport(_) => "transport",
            CmsError::RedirectListing(_) => "redirect_listing",
            CmsError::RedirectConfig(_) => "redirect_config",
            CmsError::RedirectLoop(_) => "redirect_loop",
            CmsError::InvalidUrl { .. } => "invalid_url",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CmsError::PageNotFound { path: "/missing".into() };
        assert_eq!(err.to_string(), "Page not found: /missing");

        let err = CmsError::Transport(FetchError::Status {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(err.to_string(), "Error loading content: Error 500: boom");
        assert_eq!(err.kind(), "transport");
    }
}
