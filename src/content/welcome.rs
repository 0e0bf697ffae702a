//! Welcome file handling
//!
//! Directory resources are marked so the service can redirect to or serve
//! a welcome file, or fall back to a listing.

use super::{ContentKind, ContentLookup, ResourceContent};
use std::future::Future;
use std::io;

/// Finds the welcome target for a directory request
pub trait WelcomeResolver: Send + Sync {
    /// Path in context of the welcome target, `None` if there is none
    ///
    /// `path` is the request path of `directory` and ends with `/`.
    fn welcome_target(
        &self,
        path: &str,
        directory: &ResourceContent,
    ) -> impl Future<Output = io::Result<Option<String>>> + Send;
}

/// Picks the first configured file name that exists in the directory
#[derive(Debug, Clone)]
pub struct WelcomeFiles {
    files: Vec<String>,
}

impl WelcomeFiles {
    pub const fn new(files: Vec<String>) -> Self {
        Self { files }
    }
}

impl Default for WelcomeFiles {
    fn default() -> Self {
        Self::new(vec!["index.html".to_string()])
    }
}

impl WelcomeResolver for WelcomeFiles {
    async fn welcome_target(
        &self,
        path: &str,
        directory: &ResourceContent,
    ) -> io::Result<Option<String>> {
        for file in &self.files {
            match tokio::fs::metadata(directory.resource.join(file)).await {
                Ok(m) if m.is_file() => return Ok(Some(format!("{path}{file}"))),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

/// What to do with a found welcome target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WelcomeAction {
    /// Redirect to this `Location` (path and query)
    Redirect(String),
    /// Serve the resource at this path in context
    Serve(String),
}

/// Lookup decorator marking directories for welcome processing
#[derive(Debug, Clone)]
pub struct WelcomeLookup<L> {
    inner: L,
}

impl<L: ContentLookup> WelcomeLookup<L> {
    pub const fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<L: ContentLookup> ContentLookup for WelcomeLookup<L> {
    async fn lookup(&self, path: &str) -> io::Result<Option<ResourceContent>> {
        let content = self.inner.lookup(path).await?;
        Ok(content.map(|mut c| {
            if c.is_directory {
                c.kind = ContentKind::Welcome;
            }
            c
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FileLookup;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_directory_marked() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        let lookup = WelcomeLookup::new(FileLookup::new(dir.path()).unwrap());

        let docs = lookup.lookup("/docs/").await.unwrap().unwrap();
        assert!(matches!(docs.kind, ContentKind::Welcome));
        let file = lookup.lookup("/a.txt").await.unwrap().unwrap();
        assert!(matches!(file.kind, ContentKind::Plain));
    }

    #[tokio::test]
    async fn test_welcome_files_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.htm"), "x").unwrap();
        std::fs::create_dir(dir.path().join("index.html")).unwrap();
        let lookup = FileLookup::new(dir.path()).unwrap();
        let root = lookup.lookup("/").await.unwrap().unwrap();

        let files = WelcomeFiles::new(vec!["index.html".into(), "index.htm".into()]);
        let target = files.welcome_target("/", &root).await.unwrap();
        assert_eq!(target.as_deref(), Some("/index.htm"));

        let files = WelcomeFiles::default();
        assert!(files.welcome_target("/", &root).await.unwrap().is_none());
    }
}
