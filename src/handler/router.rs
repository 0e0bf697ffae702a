//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, dispatch to
//! the resource service, and access logging.

use crate::config::AppState;
use crate::http::{self, ResourceResponse};
use crate::logger::{self, AccessLogEntry};
use hyper::header::{self, HeaderMap};
use hyper::{Method, Request, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<ResourceResponse, Infallible> {
    let started = Instant::now();

    let response = match check_http_method(req.method()) {
        Some(resp) => resp,
        None => match state.service.serve(&req).await {
            Some(resp) => resp,
            None => {
                logger::log_debug(&format!("Not found: {}", req.uri().path()));
                http::build_404_response()
            }
        },
    };

    if state.access_log_enabled() {
        let entry = access_entry(&req, &response, peer_addr, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(response)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<ResourceResponse> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

fn access_entry<B>(
    req: &Request<B>,
    response: &ResourceResponse,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = header_str(response.headers(), &header::CONTENT_LENGTH)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.content_encoding =
        header_str(response.headers(), &header::CONTENT_ENCODING).map(ToString::to_string);
    entry.referer = header_str(req.headers(), &header::REFERER).map(ToString::to_string);
    entry.user_agent = header_str(req.headers(), &header::USER_AGENT).map(ToString::to_string);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

fn header_str<'a>(headers: &'a HeaderMap, name: &header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
