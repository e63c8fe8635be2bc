//! URL → content path resolution.
//!
//! # Variations
//! ```text
//! variation 1: literal path ("/about" or "/about/index.html" for "/about/")
//! variation 2: directory index ("/about/index.html" for "/about")
//! variation 3+: PageNotFound
//! ```
//! Strict resolution only ever tries the literal path.

use url::Url;

use crate::config::ClientConfig;
use crate::error::CmsError;
use crate::resolve::path::{ends_with_separator, extension, join_path, url_path};

/// Retry state threaded through successive resolution attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionOptions {
    pub strict: bool,
    pub variation: u32,
}

impl ResolutionOptions {
    pub fn new(strict: bool) -> Self {
        Self { strict, variation: 1 }
    }

    /// Last variation the resolver may produce a path for.
    pub fn max_variation(&self) -> u32 {
        if self.strict {
            1
        } else {
            2
        }
    }
}

/// Maps page URLs onto the published content files.
#[derive(Debug, Clone)]
pub struct PathResolver {
    page_files_path: String,
    default_document: String,
}

impl PathResolver {
    pub fn new(page_files_path: impl Into<String>, default_document: impl Into<String>) -> Self {
        Self {
            page_files_path: page_files_path.into(),
            default_document: default_document.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.page_files_path, &config.default_document)
    }

    pub fn page_files_path(&self) -> &str {
        &self.page_files_path
    }

    /// Resolve `url` to the content path for `options.variation`.
    ///
    /// When variation 2 finds that the path already carries the default
    /// document's extension, the path is returned unchanged and
    /// `options.variation` is advanced so the next attempt fails.
    pub fn resolve(
        &self,
        url: &str,
        location: &Url,
        options: &mut ResolutionOptions,
    ) -> Result<String, CmsError> {
        let urlpath = url_path(url, location)?;
        let mut path = join_path(&self.page_files_path, &urlpath);

        if options.strict {
            if options.variation >= 2 {
                return Err(CmsError::PageNotFound { path: urlpath });
            }
            return Ok(path);
        }

        if ends_with_separator(&path) {
            path = join_path(&path, &self.default_document);
        }

        match options.variation {
            0 | 1 => Ok(path),
            2 => {
                let default_ext = extension(&self.default_document);
                if default_ext.is_some() && extension(&path) == default_ext {
                    options.variation += 1;
                    Ok(path)
                } else {
                    Ok(join_path(&path, &self.default_document))
                }
            }
            _ => Err(CmsError::PageNotFound { path: urlpath }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> Url {
        Url::parse("https://www.example.com/").unwrap()
    }

    fn resolver() -> PathResolver {
        PathResolver::new("/", "index.html")
    }

    #[test]
    fn test_directory_gets_default_document() {
        let mut opts = ResolutionOptions::new(false);
        let path = resolver().resolve("/about/", &location(), &mut opts).unwrap();
        assert_eq!(path, "/about/index.html");
    }

    #[test]
    fn test_variation_two_appends_default_document() {
        let mut opts = ResolutionOptions { strict: false, variation: 2 };
        let path = resolver().resolve("/about.htm", &location(), &mut opts).unwrap();
        assert_eq!(path, "/about.htm/index.html");
        assert_eq!(opts.variation, 2);
    }

    #[test]
    fn test_variation_two_matching_extension_is_final() {
        let mut opts = ResolutionOptions { strict: false, variation: 2 };
        let path = resolver().resolve("/about.html", &location(), &mut opts).unwrap();
        assert_eq!(path, "/about.html");
        assert_eq!(opts.variation, 3);

        opts.variation += 1;
        assert!(matches!(
            resolver().resolve("/about.html", &location(), &mut opts),
            Err(CmsError::PageNotFound { .. })
        ));
    }

    #[test]
    fn test_exhaustion_bounds() {
        for url in ["/", "/about", "/about/", "/about.html", "about.htm"] {
            for variation in 3..6 {
                let mut opts = ResolutionOptions { strict: false, variation };
                assert!(resolver().resolve(url, &location(), &mut opts).is_err());
            }
            for variation in 2..5 {
                let mut opts = ResolutionOptions { strict: true, variation };
                assert!(resolver().resolve(url, &location(), &mut opts).is_err());
            }
        }
    }

    #[test]
    fn test_strict_mode_keeps_literal_path() {
        let mut opts = ResolutionOptions::new(true);
        let path = resolver().resolve("/about/", &location(), &mut opts).unwrap();
        assert_eq!(path, "/about/");
    }

    #[test]
    fn test_page_files_prefix() {
        let resolver = PathResolver::new("/pages/", "index.html");
        let mut opts = ResolutionOptions::new(false);
        let path = resolver
            .resolve("https://www.example.com/news/item?id=3", &location(), &mut opts)
            .unwrap();
        assert_eq!(path, "/pages/news/item");
    }

    #[test]
    fn test_not_found_carries_url_path() {
        let mut opts = ResolutionOptions { strict: false, variation: 3 };
        match resolver().resolve("/gone", &location(), &mut opts) {
            Err(CmsError::PageNotFound { path }) => assert_eq!(path, "/gone"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
