//! Content transport.
//!
//! # Responsibilities
//! - GET a content path and decode the JSON body
//! - Report 404 as a distinguished status so the loader can retry
//! - Report undecodable bodies as `InvalidJson`, carrying the URL
//!
//! # Design Decisions
//! - The loader only depends on the trait; tests inject mocks
//! - The request timeout belongs to the transport, not to the router

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::config::FetchConfig;
use crate::content::types::FetchError;

/// GET/JSON transport used by the content loader.
pub trait ContentFetcher {
    /// Fetch `path` and decode it as JSON.
    fn get_json(&self, path: &str) -> impl Future<Output = Result<Value, FetchError>>;
}

/// [`ContentFetcher`] backed by an HTTP client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: Url,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| FetchError::Connection(format!("invalid origin {}: {}", config.origin, e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        Ok(Self { client, origin })
    }

    fn absolute(&self, path: &str) -> Result<Url, FetchError> {
        self.origin
            .join(path)
            .map_err(|e| FetchError::Connection(format!("invalid path {}: {}", path, e)))
    }
}

impl ContentFetcher for HttpFetcher {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.absolute(path)?;

        tracing::debug!(url = %url, "Fetching content");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        if !(status.is_success() || status.is_redirection()) {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|_| FetchError::InvalidJson {
            url: path.to_string(),
            content: body,
        })
    }
}
