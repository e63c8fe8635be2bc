//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, hop limits > 0)
//! - Check that selectors and origins parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::ClientConfig;
use crate::dom::selector::SelectorList;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.page_files_path.trim().is_empty() {
        errors.push(ValidationError::new("page_files_path", "must not be empty"));
    }

    if config.default_document.trim().is_empty() {
        errors.push(ValidationError::new("default_document", "must not be empty"));
    } else if config.default_document.contains(['/', '\\']) {
        errors.push(ValidationError::new(
            "default_document",
            "must be a file name without path separators",
        ));
    }

    if let Some(path) = &config.redirect_listing_path {
        if path.trim().is_empty() {
            errors.push(ValidationError::new(
                "redirect_listing_path",
                "must not be empty when set",
            ));
        }
    }

    if config.cms_templates.is_empty() {
        errors.push(ValidationError::new(
            "cms_templates",
            "must list at least one template (use \"*\" for all)",
        ));
    }

    if let Some(selector) = &config.footer_container {
        if let Err(e) = SelectorList::parse(selector) {
            errors.push(ValidationError::new("footer_container", e.to_string()));
        }
    }

    if config.proxy_confirm_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "proxy_confirm_timeout_ms",
            "must be greater than zero",
        ));
    }

    if config.max_redirects == 0 {
        errors.push(ValidationError::new("max_redirects", "must be greater than zero"));
    }

    if config.fetch.timeout_secs == 0 {
        errors.push(ValidationError::new("fetch.timeout_secs", "must be greater than zero"));
    }

    if let Err(e) = url::Url::parse(&config.fetch.origin) {
        errors.push(ValidationError::new("fetch.origin", e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
