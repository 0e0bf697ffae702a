use crate::http::{self, ResourceResponse};
use std::io;
use thiserror::Error;

/// Failures while serving a resource, before the response is returned
#[derive(Debug, Error)]
pub enum ServeError {
    /// `If-Match` / `If-None-Match` could not be parsed; carries the raw
    /// header value for the error log
    #[error("malformed precondition header: {0}")]
    MalformedPrecondition(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ServeError {
    /// Error response sent in place of the resource
    pub fn to_response(&self) -> ResourceResponse {
        match self {
            Self::MalformedPrecondition(_) => {
                http::build_400_response("malformed precondition header")
            }
            Self::Io(_) => http::build_500_response(),
        }
    }
}
