//! Resource content module
//!
//! A `ResourceContent` describes one servable resource: its metadata and a
//! way to open its bytes. Lookups produce contents from request paths and
//! are stacked as decorators:
//!
//! ```text
//! WelcomeLookup -> PrecompressedLookup -> FileLookup
//! ```

pub mod file;
pub mod listing;
pub mod negotiator;
pub mod precompressed;
pub mod welcome;

pub use file::{AliasCheck, FileLookup, RootContainment};
pub use listing::{DirectoryRenderer, HtmlListing};
pub use negotiator::EncodingNegotiator;
pub use precompressed::{PrecompressedFormat, PrecompressedLookup};
pub use welcome::{WelcomeAction, WelcomeFiles, WelcomeLookup, WelcomeResolver};

use crate::http::{date, mime};
use hyper::body::Bytes;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncSeek};

/// Readable and seekable content stream
pub trait ContentStream: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send> ContentStream for T {}

/// Owned reader over a resource's bytes; dropping it releases the handle
pub type ContentReader = Box<dyn ContentStream>;

/// Where the bytes of a resource live
#[derive(Debug, Clone)]
pub enum ContentSource {
    File(PathBuf),
    Memory(Bytes),
}

impl ContentSource {
    /// Open a fresh reader positioned at the start
    pub async fn open(&self) -> io::Result<ContentReader> {
        match self {
            Self::File(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(Box::new(file))
            }
            Self::Memory(data) => Ok(Box::new(io::Cursor::new(data.clone()))),
        }
    }
}

/// A precompressed sibling of a resource
#[derive(Debug, Clone)]
pub struct PrecompressedVariant {
    pub format: PrecompressedFormat,
    pub content: ResourceContent,
}

/// How a resource is processed once conditional checks pass
#[derive(Debug, Clone, Default)]
pub enum ContentKind {
    /// Send the bytes as they are
    #[default]
    Plain,
    /// Negotiate among precompressed siblings, falling back to the base
    Precompressed(Vec<PrecompressedVariant>),
    /// Directory: welcome file, listing, or 403
    Welcome,
}

/// Metadata and body source of a servable resource
#[derive(Debug, Clone)]
pub struct ResourceContent {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    /// `None` when the length is not known up front
    pub content_length: Option<u64>,
    pub last_modified: Option<SystemTime>,
    /// Weak entity tag
    pub etag: Option<String>,
    pub is_directory: bool,
    /// Physical location, used by alias checks and listings
    pub resource: PathBuf,
    pub source: ContentSource,
    pub kind: ContentKind,
}

impl ResourceContent {
    /// In-memory content with a known length
    pub fn from_bytes(resource: impl Into<PathBuf>, data: impl Into<Bytes>) -> Self {
        let resource = resource.into();
        let data = data.into();
        Self {
            content_type: Some(mime::content_type_for_path(&resource).to_string()),
            content_encoding: None,
            content_length: Some(data.len() as u64),
            last_modified: None,
            etag: None,
            is_directory: false,
            resource,
            source: ContentSource::Memory(data),
            kind: ContentKind::Plain,
        }
    }

    /// Charset parameter of the content type
    pub fn character_encoding(&self) -> Option<&str> {
        self.content_type.as_deref().and_then(mime::charset)
    }

    /// Content type without parameters
    pub fn mime_type(&self) -> Option<&str> {
        self.content_type.as_deref().map(mime::mime_type)
    }

    /// `Last-Modified` header value
    pub fn last_modified_value(&self) -> Option<String> {
        self.last_modified.map(date::format_http_date)
    }

    pub async fn open(&self) -> io::Result<ContentReader> {
        self.source.open().await
    }
}

/// Maps a path in context to a resource
///
/// `Ok(None)` means not found, including paths rejected for safety.
pub trait ContentLookup: Send + Sync {
    fn lookup(
        &self,
        path: &str,
    ) -> impl Future<Output = io::Result<Option<ResourceContent>>> + Send;
}
