//! `ETag` module
//!
//! Weak `ETag` generation from resource metadata, suffix rewriting for
//! precompressed variants, and weak comparison for conditional requests.

use std::time::{SystemTime, UNIX_EPOCH};

/// Separator between the opaque tag and a variant suffix, e.g. `W/"1a2b--gzip"`
pub const SUFFIX_SEPARATOR: &str = "--";

/// Generate a weak `ETag` from last-modified time and length
///
/// # Returns
/// Weak quoted `ETag` string, e.g., `W/"18c2f9a3b10-2a"`
pub fn generate_weak_etag(last_modified: Option<SystemTime>, length: Option<u64>) -> String {
    let millis = last_modified
        .and_then(|lm| lm.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_millis());
    let length = length.unwrap_or(0);
    format!("W/\"{millis:x}-{length:x}\"")
}

/// Rewrite an `ETag` so its opaque part carries `suffix`
///
/// Any suffix already present is replaced, so an empty `suffix` yields the
/// base `ETag` of a precompressed variant.
pub fn rewrite_with_suffix(etag: &str, suffix: &str) -> String {
    let (weak, opaque) = split_etag(etag);
    let base = strip_suffix(opaque);
    format!("{}\"{base}{suffix}\"", if weak { "W/" } else { "" })
}

/// Weakly compare a content `ETag` with one tag from a request header
///
/// The `W/` prefix and any variant suffix are ignored on both sides.
pub fn matches(content_etag: &str, request_tag: &str) -> bool {
    if request_tag == "*" {
        return true;
    }
    let (_, content) = split_etag(content_etag);
    let (_, requested) = split_etag(request_tag);
    strip_suffix(content) == strip_suffix(requested)
}

/// Split into (is weak, opaque tag without quotes)
fn split_etag(etag: &str) -> (bool, &str) {
    let etag = etag.trim();
    let (weak, rest) = match etag.strip_prefix("W/") {
        Some(rest) => (true, rest),
        None => (false, etag),
    };
    let opaque = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(rest);
    (weak, opaque)
}

fn strip_suffix(opaque: &str) -> &str {
    opaque
        .rfind(SUFFIX_SEPARATOR)
        .map_or(opaque, |idx| &opaque[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_weak_etag() {
        let lm = UNIX_EPOCH + Duration::from_millis(0x1234);
        let etag = generate_weak_etag(Some(lm), Some(42));
        assert_eq!(etag, "W/\"1234-2a\"");
    }

    #[test]
    fn test_etag_consistency() {
        let lm = SystemTime::now();
        assert_eq!(
            generate_weak_etag(Some(lm), Some(10)),
            generate_weak_etag(Some(lm), Some(10))
        );
        assert_ne!(
            generate_weak_etag(Some(lm), Some(10)),
            generate_weak_etag(Some(lm), Some(11))
        );
    }

    #[test]
    fn test_rewrite_with_suffix() {
        assert_eq!(rewrite_with_suffix("W/\"abc\"", "--gzip"), "W/\"abc--gzip\"");
        assert_eq!(rewrite_with_suffix("W/\"abc--gzip\"", "--br"), "W/\"abc--br\"");
        assert_eq!(rewrite_with_suffix("W/\"abc--gzip\"", ""), "W/\"abc\"");
        assert_eq!(rewrite_with_suffix("\"abc\"", "--br"), "\"abc--br\"");
    }

    #[test]
    fn test_matches() {
        let etag = "W/\"abc\"";
        assert!(matches(etag, "W/\"abc\""));
        assert!(matches(etag, "\"abc\""));
        assert!(matches(etag, "W/\"abc--gzip\""));
        assert!(matches(etag, "*"));
        assert!(!matches(etag, "\"abcd\""));
        assert!(!matches(etag, "\"different\""));
    }
}
