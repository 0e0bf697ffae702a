//! Request path handling
//!
//! Decodes the request path into a path in context and re-encodes paths
//! for `Location` headers.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped when a path is written back into a header
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Decode and canonicalize a request path
///
/// Empty and `.` segments are dropped and `..` removes the previous
/// segment. Returns `None` for undecodable paths, paths containing NUL, and
/// paths that would climb above the root. A trailing slash is kept.
///
/// # Examples
/// ```
/// use rust_fileserver::service::path::normalize_path;
/// assert_eq!(normalize_path("/a//b/./c%20d").as_deref(), Some("/a/b/c d"));
/// assert_eq!(normalize_path("/a/b/../").as_deref(), Some("/a/"));
/// assert_eq!(normalize_path("/../etc/passwd"), None);
/// ```
pub fn normalize_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded.contains('\0') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    let trailing = decoded.ends_with('/') || decoded.ends_with("/.") || decoded.ends_with("/..");
    if trailing && !segments.is_empty() {
        path.push('/');
    }
    Some(path)
}

/// Percent-encode a decoded path for use in a header
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// Append the query, if any, to a location
pub fn with_query(location: String, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{location}?{q}"),
        _ => location,
    }
}
