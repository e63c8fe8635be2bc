//! Page data and redirect listing loading.
//!
//! # Responsibilities
//! - Resolve a page URL and fetch its content, walking URL variations on 404
//! - Load the redirect listing, if one is configured
//!
//! # Design Decisions
//! - Variation retry is a bounded loop; the resolver fails once exhausted
//! - Only 404 is retried; every other failure ends the loop immediately
//! - A response that is not a page document is `InvalidContent`, so the
//!   router can hand the URL back to the browser

use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::content::fetcher::ContentFetcher;
use crate::content::types::{FetchError, PageData};
use crate::error::CmsError;
use crate::observability::metrics;
use crate::resolve::path::join_path;
use crate::resolve::{PathResolver, ResolutionOptions};
use crate::routing::matcher::Redirect;

/// Content loading on top of an injected [`ContentFetcher`].
#[derive(Debug)]
pub struct ContentLoader<F> {
    fetcher: F,
    resolver: PathResolver,
    strict: bool,
    redirect_listing_path: Option<String>,
}

impl<F: ContentFetcher> ContentLoader<F> {
    pub fn new(fetcher: F, config: &ClientConfig) -> Self {
        Self {
            fetcher,
            resolver: PathResolver::from_config(config),
            strict: config.strict_url_resolution,
            redirect_listing_path: config.redirect_listing_path.clone(),
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch the page data for `url`.
    pub async fn page_data(&self, url: &str, location: &Url) -> Result<PageData, CmsError> {
        let requested = if url.is_empty() { location.as_str() } else { url };
        let mut options = ResolutionOptions::new(self.strict);

        loop {
            let content_path = self.resolver.resolve(url, location, &mut options)?;

            match self.fetcher.get_json(&content_path).await {
                Ok(value) => {
                    metrics::record_fetch_attempt("200");
                    return serde_json::from_value::<PageData>(value).map_err(|e| {
                        CmsError::InvalidContent {
                            url: requested.to_string(),
                            content_path: content_path.clone(),
                            body: e.to_string(),
                        }
                    });
                }
                Err(e) if e.is_not_found() => {
                    metrics::record_fetch_attempt("404");
                    tracing::debug!(
                        path = %content_path,
                        variation = options.variation,
                        "Content not found, trying next variation"
                    );
                    options.variation += 1;
                }
                Err(FetchError::InvalidJson { content, .. }) => {
                    metrics::record_fetch_attempt("invalid_json");
                    return Err(CmsError::InvalidContent {
                        url: requested.to_string(),
                        content_path,
                        body: content,
                    });
                }
                Err(e) => {
                    metrics::record_fetch_attempt(&e.status_label());
                    tracing::warn!(path = %content_path, error = %e, "Content fetch failed");
                    return Err(CmsError::Transport(e));
                }
            }
        }
    }

    /// Path the redirect listing is fetched from, if configured.
    pub fn redirect_listing_path(&self) -> Option<String> {
        let path = self.redirect_listing_path.as_deref()?;
        if path.starts_with(['/', '\\']) {
            Some(path.to_string())
        } else {
            Some(join_path(self.resolver.page_files_path(), path))
        }
    }

    /// Load the redirect listing; empty when none is configured.
    pub async fn redirects(&self) -> Result<Vec<Redirect>, CmsError> {
        let Some(path) = self.redirect_listing_path() else {
            return Ok(Vec::new());
        };

        let value = self
            .fetcher
            .get_json(&path)
            .await
            .map_err(CmsError::RedirectListing)?;

        if value.is_null() {
            return Ok(Vec::new());
        }

        let Value::Array(entries) = value else {
            return Err(CmsError::RedirectListing(FetchError::InvalidJson {
                url: path,
                content: value.to_string(),
            }));
        };

        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Redirect>(entry) {
                Ok(redirect) => Some(redirect),
                Err(e) => {
                    tracing::warn!(listing = %path, error = %e, "Skipping malformed redirect entry");
                    None
                }
            })
            .collect())
    }
}
