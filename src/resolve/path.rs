//! Path helpers shared by the resolver and the redirect matcher.

use url::Url;

use crate::error::CmsError;

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Join two path fragments with exactly one `/` at the seam.
pub fn join_path(a: &str, b: &str) -> String {
    if a.is_empty() {
        return b.to_string();
    }
    if b.is_empty() {
        return a.to_string();
    }
    format!(
        "{}/{}",
        a.trim_end_matches(is_separator),
        b.trim_start_matches(is_separator)
    )
}

/// Extension of the last path segment, including the leading dot.
pub fn extension(path: &str) -> Option<&str> {
    let file = path.rsplit(is_separator).next().unwrap_or(path);
    file.rfind('.').map(|dot| &file[dot..])
}

/// Whether the path names a directory.
pub fn ends_with_separator(path: &str) -> bool {
    path.ends_with(is_separator)
}

/// Reduce a full, network-absolute, root-relative or bare URL to its path
/// component, resolved against the current location.
///
/// An empty `url` stands for the current location itself.
pub fn url_path(url: &str, location: &Url) -> Result<String, CmsError> {
    let mut target = if url.is_empty() {
        location.as_str().to_string()
    } else {
        url.to_string()
    };

    if !target.contains("//") && !target.starts_with('/') {
        let bare = target.strip_prefix('\\').unwrap_or(&target);
        target = format!("/{bare}");
    }

    let resolved = location.join(&target).map_err(|source| CmsError::InvalidUrl {
        url: target.clone(),
        source,
    })?;

    let path = resolved.path();
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("/{path}"))
    }
}
