//! HTTP response building module
//!
//! `ResponseDraft` collects status and headers for a resource response
//! before the body is attached. Header overrides registered on a draft are
//! applied whenever that header is emitted, which lets a precompressed
//! variant present itself with the base resource's identity.
//!
//! The `build_*` functions produce the fixed short-circuit responses.

use super::body::ResourceBody;
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::{Response, StatusCode};

/// Response type produced by the resource service
pub type ResourceResponse = Response<ResourceBody>;

#[derive(Debug, Clone)]
struct HeaderOverride {
    name: HeaderName,
    value: Option<HeaderValue>,
    force: bool,
}

/// Status and headers of a response under construction
#[derive(Debug, Clone)]
pub struct ResponseDraft {
    status: StatusCode,
    headers: HeaderMap,
    overrides: Vec<HeaderOverride>,
}

impl Default for ResponseDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDraft {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            overrides: Vec::new(),
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Set a header, replacing previous values
    pub fn put(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Set a header from a string; values that are not valid header text
    /// are logged and dropped
    pub fn put_str(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(v) => self.put(name, v),
            Err(_) => crate::logger::log_warning(&format!(
                "Dropping invalid {name} header value: {value:?}"
            )),
        }
    }

    /// Append a header value, keeping existing ones
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    pub fn remove(&mut self, name: &HeaderName) {
        self.headers.remove(name);
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        self.effective(name).is_some()
    }

    /// Header value as it will be emitted, overrides included
    pub fn effective(&self, name: &HeaderName) -> Option<&HeaderValue> {
        match self.overrides.iter().rev().find(|o| o.name == *name) {
            Some(o) if o.force || self.headers.contains_key(name) => o.value.as_ref(),
            _ => self.headers.get(name),
        }
    }

    /// Rewrite `name` to `value` (or drop it when `None`) if it is emitted
    pub fn intercept(&mut self, name: HeaderName, value: Option<HeaderValue>) {
        self.overrides.push(HeaderOverride {
            name,
            value,
            force: false,
        });
    }

    /// Emit `name` with `value` regardless of what was put
    pub fn force(&mut self, name: HeaderName, value: HeaderValue) {
        self.overrides.push(HeaderOverride {
            name,
            value: Some(value),
            force: true,
        });
    }

    /// Forget the overrides registered for `name`
    pub fn drop_override(&mut self, name: &HeaderName) {
        self.overrides.retain(|o| o.name != *name);
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// Apply overrides and attach the body
    pub fn into_response(mut self, body: ResourceBody) -> ResourceResponse {
        for o in self.overrides {
            if !o.force && !self.headers.contains_key(&o.name) {
                continue;
            }
            match o.value {
                Some(value) => {
                    self.headers.insert(o.name, value);
                }
                None => {
                    self.headers.remove(&o.name);
                }
            }
        }
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Build 304 Not Modified response, echoing the matched `ETag` if any
pub fn build_304_response(etag: Option<&str>) -> ResourceResponse {
    let mut builder = Response::builder().status(304);
    if let Some(etag) = etag {
        builder = builder.header(header::ETAG, etag);
    }
    builder.body(ResourceBody::empty()).unwrap_or_else(|e| {
        log_build_error("304", &e);
        let mut response = Response::new(ResourceBody::empty());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        response
    })
}

/// Build 412 Precondition Failed response
pub fn build_412_response() -> ResourceResponse {
    build_text_response(
        StatusCode::PRECONDITION_FAILED,
        "412 Precondition Failed".to_string(),
    )
}

/// Build 400 Bad Request response
pub fn build_400_response(reason: &str) -> ResourceResponse {
    build_text_response(StatusCode::BAD_REQUEST, format!("400 Bad Request: {reason}"))
}

/// Build 403 Forbidden response
pub fn build_403_response() -> ResourceResponse {
    build_text_response(StatusCode::FORBIDDEN, "403 Forbidden".to_string())
}

/// Build 404 Not Found response
pub fn build_404_response() -> ResourceResponse {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found".to_string())
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> ResourceResponse {
    build_text_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "500 Internal Server Error".to_string(),
    )
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> ResourceResponse {
    Response::builder()
        .status(405)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::ALLOW, "GET, HEAD, OPTIONS")
        .body(ResourceBody::full("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(ResourceBody::full("405 Method Not Allowed"))
        })
}

/// Build OPTIONS response
pub fn build_options_response() -> ResourceResponse {
    Response::builder()
        .status(204)
        .header(header::ALLOW, "GET, HEAD, OPTIONS")
        .body(ResourceBody::empty())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(ResourceBody::empty())
        })
}

/// Build 302 redirect response with an empty body
pub fn build_redirect_response(location: &str) -> ResourceResponse {
    Response::builder()
        .status(302)
        .header(header::LOCATION, location)
        .header(header::CONTENT_LENGTH, 0)
        .body(ResourceBody::empty())
        .unwrap_or_else(|e| {
            log_build_error("302", &e);
            let mut response = Response::new(ResourceBody::empty());
            *response.status_mut() = StatusCode::FOUND;
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
            response
        })
}

fn build_text_response(status: StatusCode, message: String) -> ResourceResponse {
    let fallback = message.clone();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_LENGTH, message.len())
        .body(ResourceBody::full(message))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(ResourceBody::full(fallback))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_put_and_remove() {
        let mut draft = ResponseDraft::new();
        draft.put_str(header::CONTENT_TYPE, "text/plain");
        assert!(draft.contains(&header::CONTENT_TYPE));
        draft.remove(&header::CONTENT_TYPE);
        assert!(!draft.contains(&header::CONTENT_TYPE));
    }

    #[test]
    fn test_invalid_value_dropped() {
        let mut draft = ResponseDraft::new();
        draft.put_str(header::ETAG, "bad\nvalue");
        assert!(!draft.contains(&header::ETAG));
    }

    #[test]
    fn test_intercept_only_when_emitted() {
        let mut draft = ResponseDraft::new();
        draft.intercept(header::ETAG, Some(HeaderValue::from_static("W/\"a--gzip\"")));
        let response = draft.clone().into_response(ResourceBody::empty());
        assert!(response.headers().get(header::ETAG).is_none());

        draft.put_str(header::ETAG, "W/\"b\"");
        assert_eq!(draft.effective(&header::ETAG).unwrap(), "W/\"a--gzip\"");
        let response = draft.into_response(ResourceBody::empty());
        assert_eq!(response.headers()[header::ETAG], "W/\"a--gzip\"");
    }

    #[test]
    fn test_intercept_removal() {
        let mut draft = ResponseDraft::new();
        draft.intercept(header::CONTENT_ENCODING, None);
        draft.put_str(header::CONTENT_ENCODING, "gzip");
        assert!(!draft.contains(&header::CONTENT_ENCODING));
        let response = draft.into_response(ResourceBody::empty());
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    }

    #[test]
    fn test_force_always_emitted() {
        let mut draft = ResponseDraft::new();
        draft.force(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        draft.set_status(StatusCode::PARTIAL_CONTENT);
        let response = draft.into_response(ResourceBody::empty());
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    }

    #[test]
    fn test_drop_and_clear_overrides() {
        let mut draft = ResponseDraft::new();
        draft.intercept(header::CONTENT_TYPE, Some(HeaderValue::from_static("text/css")));
        draft.force(header::CONTENT_ENCODING, HeaderValue::from_static("br"));
        draft.put_str(header::CONTENT_TYPE, "application/gzip");
        draft.drop_override(&header::CONTENT_TYPE);
        assert_eq!(draft.effective(&header::CONTENT_TYPE).unwrap(), "application/gzip");
        assert!(draft.contains(&header::CONTENT_ENCODING));
        draft.clear_overrides();
        assert!(!draft.contains(&header::CONTENT_ENCODING));
    }

    #[test]
    fn test_redirect_response() {
        let response = build_redirect_response("/docs/?a=1");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/docs/?a=1");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "0");
    }

    #[test]
    fn test_redirect_fallback_keeps_status() {
        // A control character makes the Location value invalid
        let response = build_redirect_response("/docs/\n");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(!response.headers().contains_key(header::LOCATION));
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "0");
    }

    #[test]
    fn test_error_responses() {
        assert_eq!(build_400_response("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(build_412_response().status(), StatusCode::PRECONDITION_FAILED);
        let not_modified = build_304_response(Some("W/\"a\""));
        assert_eq!(not_modified.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(not_modified.headers()[header::ETAG], "W/\"a\"");
        assert_eq!(build_403_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(build_404_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            build_405_response().headers()[header::ALLOW],
            "GET, HEAD, OPTIONS"
        );
        assert_eq!(build_options_response().status(), StatusCode::NO_CONTENT);
    }
}
