//! Request handler module
//!
//! Validates the request method and hands GET/HEAD requests to the
//! resource service.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
