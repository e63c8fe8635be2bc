//! Page data and fetch error definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Template id marking pages that must never be rendered in place.
pub const STANDALONE_TEMPLATE: &str = "<Standalone>";

/// Structured page document published by the CMS.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PageData {
    pub title: Option<String>,
    pub header: Option<String>,
    pub css: Option<String>,
    pub js: Option<String>,
    pub footer: Option<String>,

    /// Content area key → markup. Null areas are present but empty.
    #[serde(deserialize_with = "content_areas")]
    pub content: BTreeMap<String, String>,

    /// Free-form page properties.
    #[serde(deserialize_with = "null_as_default")]
    pub properties: BTreeMap<String, Value>,

    #[serde(deserialize_with = "null_as_default")]
    pub seo: Seo,

    #[serde(alias = "templateId")]
    pub page_template_id: Option<String>,
}

/// Search-engine metadata of a page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Seo {
    pub title: Option<String>,
    pub metadesc: Option<String>,
    pub keywords: Option<String>,
    pub canonical_url: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn content_areas<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let areas = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(areas
        .into_iter()
        .map(|(key, value)| {
            let markup = match value {
                Value::Null => String::new(),
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, markup)
        })
        .collect())
}

impl PageData {
    /// Fallback page rendered when a route cannot be resolved.
    pub fn not_found() -> Self {
        let mut content = BTreeMap::new();
        content.insert(
            "body".to_string(),
            "The requested page was not found on this server.".to_string(),
        );
        Self {
            title: Some("Not Found".to_string()),
            content,
            ..Default::default()
        }
    }

    /// Title written to the document: a non-blank SEO title wins over the
    /// page title.
    pub fn document_title(&self) -> Option<&str> {
        let non_blank = |t: &&str| !t.trim().is_empty();
        self.seo
            .title
            .as_deref()
            .filter(non_blank)
            .or_else(|| self.title.as_deref().filter(non_blank))
    }

    pub fn template_id(&self) -> Option<&str> {
        self.page_template_id.as_deref().filter(|t| !t.is_empty())
    }
}

/// Errors reported by a [`ContentFetcher`](crate::content::fetcher::ContentFetcher).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("Error {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not JSON.
    #[error("Invalid JSON response from {url}")]
    InvalidJson { url: String, content: String },

    /// The request never produced a response.
    #[error("Connection Error: {0}")]
    Connection(String),
}

impl FetchError {
    /// HTTP 404 is the only condition that triggers a URL variation retry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }

    /// Label used for fetch metrics.
    pub fn status_label(&self) -> String {
        match self {
            FetchError::Status { status, .. } => status.to_string(),
            FetchError::InvalidJson { .. } => "invalid_json".to_string(),
            FetchError::Connection(_) => "connection".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_page() {
        let page: PageData = serde_json::from_str(
            r#"{
                "title": "About",
                "content": { "body": "<p>Hi</p>" },
                "seo": { "title": "About us", "metadesc": "desc" },
                "templateId": "one-column"
            }"#,
        )
        .unwrap();

        assert_eq!(page.content["body"], "<p>Hi</p>");
        assert_eq!(page.template_id(), Some("one-column"));
        assert_eq!(page.document_title(), Some("About us"));
        assert!(page.footer.is_none());
    }

    #[test]
    fn test_null_seo_and_content_values() {
        let page: PageData = serde_json::from_str(
            r#"{
                "title": "About",
                "content": { "body": null, "count": 3 },
                "seo": null,
                "properties": null
            }"#,
        )
        .unwrap();

        assert_eq!(page.content["body"], "");
        assert_eq!(page.content["count"], "3");
        assert_eq!(page.seo, Seo::default());
        assert_eq!(page.document_title(), Some("About"));

        let page: PageData = serde_json::from_str(r#"{ "content": null }"#).unwrap();
        assert!(page.content.is_empty());
    }

    #[test]
    fn test_blank_seo_title_falls_back_to_page_title() {
        let mut page = PageData {
            title: Some("About".to_string()),
            ..Default::default()
        };
        page.seo.title = Some(String::new());
        assert_eq!(page.document_title(), Some("About"));

        page.seo.title = Some("  ".to_string());
        assert_eq!(page.document_title(), Some("About"));

        page.title = None;
        assert_eq!(page.document_title(), None);
    }

    #[test]
    fn test_not_found_page() {
        let page = PageData::not_found();
        assert_eq!(page.document_title(), Some("Not Found"));
        assert!(page.content.contains_key("body"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(FetchError::Status { status: 404, body: String::new() }.is_not_found());
        assert!(!FetchError::Status { status: 500, body: String::new() }.is_not_found());
        assert!(!FetchError::Connection("reset".into()).is_not_found());
    }
}
