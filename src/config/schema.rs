//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the CMS client router.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL prefix of the published page files.
    pub page_files_path: String,

    /// Path of the redirect listing JSON file (relative paths are joined
    /// onto `page_files_path`).
    pub redirect_listing_path: Option<String>,

    /// Default directory document.
    pub default_document: String,

    /// Disable the default-document URL variations.
    pub strict_url_resolution: bool,

    /// Page template names supported by this instance, or `*` for all.
    pub cms_templates: Vec<String>,

    /// Route link clicks and history navigation through the router.
    pub bind_routing_events: bool,

    /// Selector of the element receiving the page footer (defaults to body).
    pub footer_container: Option<String>,

    /// Run client initialization when the router is constructed.
    pub auto_init: bool,

    /// How long a nested frame waits for the passthrough confirmation.
    pub proxy_confirm_timeout_ms: u64,

    /// Maximum number of 301/302 hops followed by a single route call.
    pub max_redirects: usize,

    /// HTTP fetcher settings.
    pub fetch: FetchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_files_path: "/".to_string(),
            redirect_listing_path: None,
            default_document: "index.html".to_string(),
            strict_url_resolution: false,
            cms_templates: vec!["*".to_string()],
            bind_routing_events: true,
            footer_container: None,
            auto_init: true,
            proxy_confirm_timeout_ms: 500,
            max_redirects: 16,
            fetch: FetchConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Whether a page template is served by this instance.
    pub fn supports_template(&self, template_id: &str) -> bool {
        self.cms_templates
            .iter()
            .any(|t| t == "*" || t == template_id)
    }
}

/// HTTP fetcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Origin the content paths are requested from (e.g. "https://example.com").
    pub origin: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.page_files_path, "/");
        assert_eq!(config.default_document, "index.html");
        assert_eq!(config.proxy_confirm_timeout_ms, 500);
        assert!(config.bind_routing_events);
        assert!(config.redirect_listing_path.is_none());
    }

    #[test]
    fn test_supports_template() {
        let mut config = ClientConfig::default();
        assert!(config.supports_template("anything"));

        config.cms_templates = vec!["one-column".into()];
        assert!(config.supports_template("one-column"));
        assert!(!config.supports_template("two-column"));
    }
}
