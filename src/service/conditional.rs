//! Conditional request evaluation
//!
//! Entity-tag preconditions are checked first; the date preconditions only
//! apply when the tags did not decide the outcome (RFC 9110 section 13.2.2).

use super::ServeError;
use crate::content::ResourceContent;
use crate::http::{date, etag, quoted};
use hyper::header::{self, HeaderMap, HeaderName};

/// Outcome of the precondition checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    Proceed,
    /// 304; carries the request tag that matched, if any
    NotModified { etag: Option<String> },
    /// 412
    PreconditionFailed,
}

/// Evaluate the conditional headers of a request against `content`
pub fn evaluate(
    headers: &HeaderMap,
    content: &ResourceContent,
    etags_enabled: bool,
) -> Result<Precondition, ServeError> {
    let if_match = joined(headers, &header::IF_MATCH);
    let if_none_match = joined(headers, &header::IF_NONE_MATCH);
    let if_modified_since = joined(headers, &header::IF_MODIFIED_SINCE);
    let if_unmodified_since = joined(headers, &header::IF_UNMODIFIED_SINCE);

    let content_etag = content
        .etag
        .as_deref()
        .filter(|_| etags_enabled)
        .map(|e| etag::rewrite_with_suffix(e, ""));

    if let Some(content_etag) = &content_etag {
        if let Some(ifm) = &if_match {
            if matching_tag(content_etag, ifm)?.is_none() {
                return Ok(Precondition::PreconditionFailed);
            }
        }
        if let Some(ifnm) = &if_none_match {
            return Ok(match matching_tag(content_etag, ifnm)? {
                Some(tag) => Precondition::NotModified { etag: Some(tag) },
                // The tag requires the content; dates are not consulted
                None => Precondition::Proceed,
            });
        }
    }

    let last_modified = content.last_modified;

    if let (Some(ims), Some(lm)) = (&if_modified_since, last_modified) {
        if content.last_modified_value().as_deref() == Some(ims.as_str()) {
            return Ok(Precondition::NotModified { etag: None });
        }
        if let Some(since) = date::parse_http_date(ims) {
            if date::epoch_seconds(lm) <= date::epoch_seconds(since) {
                return Ok(Precondition::NotModified { etag: None });
            }
        }
    }

    if if_match.is_none() {
        if let (Some(iums), Some(lm)) = (&if_unmodified_since, last_modified) {
            if let Some(since) = date::parse_http_date(iums) {
                if date::epoch_seconds(lm) > date::epoch_seconds(since) {
                    return Ok(Precondition::PreconditionFailed);
                }
            }
        }
    }

    Ok(Precondition::Proceed)
}

/// All values of a header joined with `, `; values that are not visible
/// ASCII are skipped
fn joined(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    (!values.is_empty()).then(|| values.join(", "))
}

/// First tag in `list` that weakly matches `content_etag`
fn matching_tag(content_etag: &str, list: &str) -> Result<Option<String>, ServeError> {
    let tags = quoted::parse_etag_list(list)
        .map_err(|e| ServeError::MalformedPrecondition(e.to_string()))?;
    Ok(tags
        .into_iter()
        .find(|tag| etag::matches(content_etag, tag))
        .map(ToString::to_string))
}
