//! Query-string parameters read at startup.

use std::collections::HashMap;

use url::Url;

/// Present (non-empty) when the page is opened from the CMS editor.
pub const EDITOR_TOKEN_PARAM: &str = "jshcms_token";
pub const EDITOR_TEMPLATE_PARAM: &str = "page_template_id";

/// Decoded query parameters; the last occurrence of a key wins.
pub fn parse_query(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn is_in_editor(url: &Url) -> bool {
    parse_query(url)
        .get(EDITOR_TOKEN_PARAM)
        .is_some_and(|token| !token.is_empty())
}

/// Template id requested by the editor, or empty.
pub fn editor_template_id(url: &Url) -> String {
    parse_query(url)
        .remove(EDITOR_TEMPLATE_PARAM)
        .unwrap_or_default()
}
