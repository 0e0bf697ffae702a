//! Filesystem lookup
//!
//! Resolves paths in context against a document root using `tokio::fs`
//! metadata. Every hit is passed through an `AliasCheck` before it is
//! returned.

use super::{ContentKind, ContentLookup, ContentSource, ResourceContent};
use crate::http::{etag, mime};
use crate::logger;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decides whether a resolved resource may be served for a path
pub trait AliasCheck: Send + Sync {
    /// `resource` is the canonical physical path of the lookup result
    fn check_alias(&self, path_in_context: &str, resource: &Path) -> bool;
}

/// Accepts resources whose canonical path stays under the root
///
/// Symlinks are followed; a link that leaves the root is an alias.
#[derive(Debug, Clone)]
pub struct RootContainment {
    root: PathBuf,
}

impl RootContainment {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AliasCheck for RootContainment {
    fn check_alias(&self, _path_in_context: &str, resource: &Path) -> bool {
        resource.starts_with(&self.root)
    }
}

/// Lookup over a directory on disk
#[derive(Clone)]
pub struct FileLookup {
    root: PathBuf,
    alias_check: Arc<dyn AliasCheck>,
}

impl std::fmt::Debug for FileLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLookup").field("root", &self.root).finish()
    }
}

impl FileLookup {
    /// Create a lookup rooted at `root`, which must exist
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        let alias_check = Arc::new(RootContainment::new(root.clone()));
        Ok(Self { root, alias_check })
    }

    #[must_use]
    pub fn with_alias_check(mut self, alias_check: Arc<dyn AliasCheck>) -> Self {
        self.alias_check = alias_check;
        self
    }

    async fn resolve(&self, path: &str) -> io::Result<Option<ResourceContent>> {
        // A trailing slash on a file is reported by the service as a redirect
        let relative = path.trim_matches('/');
        let file_path = self.root.join(relative);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) => m,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        let canonical = match tokio::fs::canonicalize(&file_path).await {
            Ok(p) => p,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };

        if !self.alias_check.check_alias(path, &canonical) {
            logger::log_warning(&format!(
                "Alias rejected: {path} -> {}",
                canonical.display()
            ));
            return Ok(None);
        }

        let is_directory = metadata.is_dir();
        let last_modified = metadata.modified().ok();
        let content_length = (!is_directory).then(|| metadata.len());

        Ok(Some(ResourceContent {
            content_type: (!is_directory)
                .then(|| mime::content_type_for_path(&file_path).to_string()),
            content_encoding: None,
            content_length,
            last_modified,
            etag: Some(etag::generate_weak_etag(last_modified, content_length)),
            is_directory,
            resource: canonical,
            source: ContentSource::File(file_path),
            kind: ContentKind::Plain,
        }))
    }
}

impl ContentLookup for FileLookup {
    async fn lookup(&self, path: &str) -> io::Result<Option<ResourceContent>> {
        self.resolve(path).await
    }
}

/// Missing files and path components that are not directories
fn is_not_found(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileLookup) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello world").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        let lookup = FileLookup::new(dir.path()).unwrap();
        (dir, lookup)
    }

    #[tokio::test]
    async fn test_lookup_file() {
        let (_dir, lookup) = setup();
        let content = lookup.lookup("/hello.txt").await.unwrap().unwrap();
        assert!(!content.is_directory);
        assert_eq!(content.content_length, Some(11));
        assert_eq!(content.mime_type(), Some("text/plain"));
        assert!(content.last_modified.is_some());
        assert!(content.etag.as_deref().unwrap().starts_with("W/\""));
    }

    #[tokio::test]
    async fn test_lookup_directory() {
        let (_dir, lookup) = setup();
        let content = lookup.lookup("/docs").await.unwrap().unwrap();
        assert!(content.is_directory);
        assert_eq!(content.content_length, None);
        assert_eq!(content.content_type, None);
    }

    #[tokio::test]
    async fn test_lookup_missing() {
        let (_dir, lookup) = setup();
        assert!(lookup.lookup("/missing.txt").await.unwrap().is_none());
        assert!(lookup.lookup("/hello.txt/child").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trailing_slash_on_file() {
        let (_dir, lookup) = setup();
        let content = lookup.lookup("/hello.txt/").await.unwrap().unwrap();
        assert!(!content.is_directory);
        assert_eq!(content.content_length, Some(11));
    }

    struct RejectAll;

    impl AliasCheck for RejectAll {
        fn check_alias(&self, _path: &str, _resource: &Path) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_alias_check_rejects() {
        let (_dir, lookup) = setup();
        let lookup = lookup.with_alias_check(Arc::new(RejectAll));
        assert!(lookup.lookup("/hello.txt").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_outside_root_rejected() {
        let (dir, lookup) = setup();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("link.txt"),
        )
        .unwrap();
        assert!(lookup.lookup("/link.txt").await.unwrap().is_none());
    }
}
