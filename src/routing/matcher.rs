//! Redirect rule matching.
//!
//! # Responsibilities
//! - Match a page path against exact, prefix and regex rules
//! - Optionally fold case per rule
//! - Substitute regex captures into the destination template
//!
//! # Design Decisions
//! - Rules compiled once per listing, matched many times
//! - First match wins; later rules are never examined
//! - Invalid or unknown rules are skipped, never fatal
//! - `$N` tokens replaced from the highest group down so `$1` never
//!   clobbers the prefix of `$10`

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::CmsError;
use crate::resolve::path::url_path;

/// How a redirect rule compares its pattern with the page path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum MatchType {
    #[serde(rename = "EXACT")]
    Exact,
    #[serde(rename = "EXACTICASE")]
    ExactCaseInsensitive,
    #[serde(rename = "BEGINS")]
    Begins,
    #[serde(rename = "BEGINSICASE")]
    BeginsCaseInsensitive,
    #[serde(rename = "REGEX")]
    Regex,
    #[serde(rename = "REGEXICASE")]
    RegexCaseInsensitive,
    /// Missing, null or unrecognized type. Never matches; such rules are
    /// skipped when the listing is compiled.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A redirect rule as published in the redirect listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Redirect {
    #[serde(rename = "redirect_url_type", default, deserialize_with = "lenient_match_type")]
    pub match_type: MatchType,

    #[serde(rename = "redirect_url", default, deserialize_with = "lenient_string")]
    pub pattern: String,

    #[serde(rename = "redirect_dest", default, deserialize_with = "lenient_string")]
    pub destination: String,

    #[serde(rename = "redirect_http_code", default, deserialize_with = "lenient_string")]
    pub http_code: String,
}

impl Redirect {
    pub fn new(
        match_type: MatchType,
        pattern: impl Into<String>,
        destination: impl Into<String>,
        http_code: impl Into<String>,
    ) -> Self {
        Self {
            match_type,
            pattern: pattern.into(),
            destination: destination.into(),
            http_code: http_code.into(),
        }
    }
}

/// Accepts strings, numbers and null for the listing's loosely typed fields.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

fn lenient_match_type<'de, D>(deserializer: D) -> Result<MatchType, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| MatchType::deserialize(v).ok())
        .unwrap_or_default())
}

/// Result of a successful redirect lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectMatch {
    pub http_code: String,
    pub destination: String,
}

/// Router action for a matched redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectCode {
    /// 301
    Permanent,
    /// 302
    Temporary,
    /// Render the destination inside a full-viewport frame.
    Passthrough,
}

impl RedirectCode {
    pub fn parse(code: &str) -> Result<Self, CmsError> {
        match code.trim() {
            "301" => Ok(RedirectCode::Permanent),
            "302" => Ok(RedirectCode::Temporary),
            "PASSTHRU" => Ok(RedirectCode::Passthrough),
            other => Err(CmsError::RedirectConfig(other.to_string())),
        }
    }
}

/// Trait for matching a page path against a rule.
pub trait PathMatcher: std::fmt::Debug {
    /// Returns the rewritten destination if `path` matches.
    fn rewrite(&self, path: &str, destination: &str) -> Option<String>;
}

/// Whole-path equality.
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    expected: String,
    case_insensitive: bool,
}

impl ExactMatcher {
    pub fn new(expected: impl Into<String>, case_insensitive: bool) -> Self {
        let expected = expected.into();
        Self {
            expected: if case_insensitive { expected.to_lowercase() } else { expected },
            case_insensitive,
        }
    }
}

impl PathMatcher for ExactMatcher {
    fn rewrite(&self, path: &str, destination: &str) -> Option<String> {
        let matched = if self.case_insensitive {
            path.to_lowercase() == self.expected
        } else {
            path == self.expected
        };
        matched.then(|| destination.to_string())
    }
}

/// Path prefix test.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    prefix: String,
    case_insensitive: bool,
}

impl PrefixMatcher {
    pub fn new(prefix: impl Into<String>, case_insensitive: bool) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: if case_insensitive { prefix.to_lowercase() } else { prefix },
            case_insensitive,
        }
    }
}

impl PathMatcher for PrefixMatcher {
    fn rewrite(&self, path: &str, destination: &str) -> Option<String> {
        let matched = if self.case_insensitive {
            path.to_lowercase().starts_with(&self.prefix)
        } else {
            path.starts_with(&self.prefix)
        };
        matched.then(|| destination.to_string())
    }
}

/// Regular expression with `$N` capture substitution.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self { regex })
    }
}

impl PathMatcher for RegexMatcher {
    fn rewrite(&self, path: &str, destination: &str) -> Option<String> {
        let captures = self.regex.captures(path)?;
        let mut rewritten = destination.to_string();
        for group in (1..captures.len()).rev() {
            let value = captures.get(group).map(|m| m.as_str()).unwrap_or("");
            rewritten = rewritten.replace(&format!("${group}"), value);
        }
        Some(rewritten)
    }
}

#[derive(Debug)]
struct CompiledRedirect {
    matcher: Box<dyn PathMatcher>,
    destination: String,
    http_code: String,
}

/// Ordered, compiled redirect table.
#[derive(Debug, Default)]
pub struct RedirectMatcher {
    rules: Vec<CompiledRedirect>,
}

impl RedirectMatcher {
    /// Compile a redirect listing, dropping rules that cannot match.
    pub fn new(redirects: &[Redirect]) -> Self {
        let mut rules = Vec::with_capacity(redirects.len());

        for redirect in redirects {
            let matcher: Box<dyn PathMatcher> = match redirect.match_type {
                MatchType::Exact => Box::new(ExactMatcher::new(&redirect.pattern, false)),
                MatchType::ExactCaseInsensitive => {
                    Box::new(ExactMatcher::new(&redirect.pattern, true))
                }
                MatchType::Begins => Box::new(PrefixMatcher::new(&redirect.pattern, false)),
                MatchType::BeginsCaseInsensitive => {
                    Box::new(PrefixMatcher::new(&redirect.pattern, true))
                }
                MatchType::Regex | MatchType::RegexCaseInsensitive => {
                    let ci = redirect.match_type == MatchType::RegexCaseInsensitive;
                    match RegexMatcher::new(&redirect.pattern, ci) {
                        Ok(m) => Box::new(m),
                        Err(e) => {
                            tracing::warn!(pattern = %redirect.pattern, error = %e, "Skipping redirect with invalid pattern");
                            continue;
                        }
                    }
                }
                MatchType::Unknown => {
                    tracing::warn!(pattern = %redirect.pattern, "Skipping redirect with unknown match type");
                    continue;
                }
            };

            rules.push(CompiledRedirect {
                matcher,
                destination: redirect.destination.clone(),
                http_code: redirect.http_code.clone(),
            });
        }

        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching an already-normalized path.
    pub fn find_path(&self, path: &str) -> Option<RedirectMatch> {
        self.rules.iter().find_map(|rule| {
            rule.matcher
                .rewrite(path, &rule.destination)
                .map(|destination| RedirectMatch {
                    http_code: rule.http_code.clone(),
                    destination,
                })
        })
    }

    /// First rule matching `url`, interpreted relative to `location`.
    pub fn find(&self, url: &str, location: &Url) -> Result<Option<RedirectMatch>, CmsError> {
        if self.rules.is_empty() {
            return Ok(None);
        }
        let path = url_path(url, location)?;
        Ok(self.find_path(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> Url {
        Url::parse("https://www.example.com/").unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let matcher = RedirectMatcher::new(&[
            Redirect::new(MatchType::Exact, "/old", "/new", "301"),
            Redirect::new(MatchType::Begins, "/old", "/x", "302"),
        ]);

        let m = matcher.find("/old", &location()).unwrap().unwrap();
        assert_eq!(m.http_code, "301");
        assert_eq!(m.destination, "/new");

        let m = matcher.find("/older", &location()).unwrap().unwrap();
        assert_eq!(m.http_code, "302");
        assert_eq!(m.destination, "/x");
    }

    #[test]
    fn test_regex_capture_substitution() {
        let matcher = RedirectMatcher::new(&[Redirect::new(
            MatchType::Regex,
            r"^/p/(\d+)$",
            "/product?id=$1",
            "301",
        )]);
        let m = matcher.find("/p/42", &location()).unwrap().unwrap();
        assert_eq!(m.destination, "/product?id=42");
        assert!(matcher.find("/p/abc", &location()).unwrap().is_none());
    }

    #[test]
    fn test_regex_high_groups_substituted_first() {
        let pattern = r"^/(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)$";
        let matcher = RedirectMatcher::new(&[Redirect::new(MatchType::Regex, pattern, "/$10-$1", "302")]);
        let m = matcher.find_path("/abcdefghij").unwrap();
        assert_eq!(m.destination, "/j-a");
    }

    #[test]
    fn test_case_insensitive_variants() {
        let matcher = RedirectMatcher::new(&[
            Redirect::new(MatchType::ExactCaseInsensitive, "/About", "/a", "301"),
            Redirect::new(MatchType::BeginsCaseInsensitive, "/NEWS/", "/n", "301"),
            Redirect::new(MatchType::RegexCaseInsensitive, "^/shop/(.*)$", "/store/$1", "301"),
        ]);

        assert_eq!(matcher.find_path("/ABOUT").unwrap().destination, "/a");
        assert_eq!(matcher.find_path("/news/today").unwrap().destination, "/n");
        assert_eq!(matcher.find_path("/SHOP/Hats").unwrap().destination, "/store/Hats");
        assert!(matcher.find_path("/other").is_none());
    }

    #[test]
    fn test_case_sensitive_variants() {
        let matcher = RedirectMatcher::new(&[
            Redirect::new(MatchType::Exact, "/About", "/a", "301"),
            Redirect::new(MatchType::Begins, "/NEWS/", "/n", "301"),
        ]);
        assert!(matcher.find_path("/about").is_none());
        assert!(matcher.find_path("/news/today").is_none());
    }

    #[test]
    fn test_invalid_and_unknown_rules_skipped() {
        let matcher = RedirectMatcher::new(&[
            Redirect::new(MatchType::Regex, "([unclosed", "/bad", "301"),
            Redirect::new(MatchType::Unknown, "/x", "/bad", "301"),
            Redirect::new(MatchType::Exact, "/x", "/good", "302"),
        ]);
        assert_eq!(matcher.len(), 1);
        assert_eq!(matcher.find_path("/x").unwrap().destination, "/good");
    }

    #[test]
    fn test_matches_on_path_only() {
        let matcher = RedirectMatcher::new(&[Redirect::new(MatchType::Exact, "/old", "/new", "301")]);
        assert!(matcher
            .find("https://www.example.com/old?utm=1#frag", &location())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_deserialize_listing() {
        let redirects: Vec<Redirect> = serde_json::from_str(
            r#"[
                { "redirect_url": "/a", "redirect_url_type": "EXACT", "redirect_dest": "/b", "redirect_http_code": 301 },
                { "redirect_url": "/c", "redirect_url_type": "WILDCARD", "redirect_dest": "/d", "redirect_http_code": "PASSTHRU" }
            ]"#,
        )
        .unwrap();
        assert_eq!(redirects[0].http_code, "301");
        assert_eq!(redirects[1].match_type, MatchType::Unknown);
    }

    #[test]
    fn test_missing_or_null_type_never_matches() {
        let redirects: Vec<Redirect> = serde_json::from_str(
            r#"[
                { "redirect_url": "/a", "redirect_url_type": null, "redirect_dest": "/b", "redirect_http_code": "301" },
                { "redirect_url": "/a", "redirect_dest": "/c", "redirect_http_code": "301" },
                { "redirect_url": "/a", "redirect_url_type": 7, "redirect_dest": "/d", "redirect_http_code": "301" }
            ]"#,
        )
        .unwrap();
        assert!(redirects.iter().all(|r| r.match_type == MatchType::Unknown));

        let matcher = RedirectMatcher::new(&redirects);
        assert!(matcher.is_empty());
        assert_eq!(matcher.find_path("/a"), None);
    }

    #[test]
    fn test_redirect_code_parse() {
        assert_eq!(RedirectCode::parse("301").unwrap(), RedirectCode::Permanent);
        assert_eq!(RedirectCode::parse("PASSTHRU").unwrap(), RedirectCode::Passthrough);
        assert!(matches!(
            RedirectCode::parse("307"),
            Err(CmsError::RedirectConfig(code)) if code == "307"
        ));
    }
}
