//! Static file server built on tokio and hyper.
//!
//! The core is [`service::ResourceService`], which answers GET and HEAD
//! requests from a chain of [`content::ContentLookup`] decorators with
//! conditional request handling, byte ranges, precompressed variants and
//! welcome files. The remaining modules wire it into an HTTP/1.1 server.

pub mod config;
pub mod content;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod service;
