//! Precompressed variant discovery
//!
//! For a resource `/app.js`, siblings such as `/app.js.br` and `/app.js.gz`
//! are served instead of the original when the client accepts their
//! encoding.

use super::{ContentKind, ContentLookup, PrecompressedVariant, ResourceContent};
use serde::{Deserialize, Serialize};
use std::io;

/// A stored compression format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecompressedFormat {
    /// File name suffix of the sibling, e.g. `.gz`
    pub extension: String,
    /// `Content-Encoding` token, e.g. `gzip`
    pub encoding: String,
    /// Appended to the base `ETag`, e.g. `--gzip`
    pub etag_suffix: String,
}

impl PrecompressedFormat {
    pub fn new(
        encoding: impl Into<String>,
        extension: impl Into<String>,
        etag_suffix: impl Into<String>,
    ) -> Self {
        Self {
            extension: extension.into(),
            encoding: encoding.into(),
            etag_suffix: etag_suffix.into(),
        }
    }

    pub fn br() -> Self {
        Self::new("br", ".br", "--br")
    }

    pub fn gzip() -> Self {
        Self::new("gzip", ".gz", "--gzip")
    }

    /// Default formats in negotiation order
    pub fn defaults() -> Vec<Self> {
        vec![Self::br(), Self::gzip()]
    }
}

/// Lookup decorator attaching precompressed siblings to a resource
#[derive(Debug, Clone)]
pub struct PrecompressedLookup<L> {
    inner: L,
    formats: Vec<PrecompressedFormat>,
}

impl<L: ContentLookup> PrecompressedLookup<L> {
    pub const fn new(inner: L, formats: Vec<PrecompressedFormat>) -> Self {
        Self { inner, formats }
    }
}

impl<L: ContentLookup> ContentLookup for PrecompressedLookup<L> {
    async fn lookup(&self, path: &str) -> io::Result<Option<ResourceContent>> {
        let Some(mut content) = self.inner.lookup(path).await? else {
            return Ok(None);
        };
        if content.is_directory {
            return Ok(Some(content));
        }

        let mut variants = Vec::new();
        for format in &self.formats {
            let sibling = format!("{path}{}", format.extension);
            if let Some(found) = self.inner.lookup(&sibling).await? {
                if found.is_directory {
                    continue;
                }
                variants.push(PrecompressedVariant {
                    format: format.clone(),
                    content: found,
                });
            }
        }

        if !variants.is_empty() {
            content.kind = ContentKind::Precompressed(variants);
        }
        Ok(Some(content))
    }
}

/// Whether `token` names one of `formats`
///
/// Matching is exact; `*` accepts any format when at least one exists.
pub fn is_encoding_available(token: &str, formats: &[PrecompressedFormat]) -> bool {
    if token == "*" {
        return !formats.is_empty();
    }
    formats.iter().any(|f| f.encoding == token)
}

/// Variant matching a negotiated token
///
/// `*` selects the first available variant in configured order.
pub fn select_variant<'a>(
    token: &str,
    variants: &'a [PrecompressedVariant],
) -> Option<&'a PrecompressedVariant> {
    variants
        .iter()
        .find(|v| is_encoding_available(token, std::slice::from_ref(&v.format)))
}
