//! Local filesystem object store.
//!
//! Stores objects as files under a configured root directory, keyed by
//! content hash. Intended for local development; production deployments
//! use [`S3ObjectStore`](super::S3ObjectStore).

use crate::ObjectStore;
use crate::content::content_key;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_key;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct LocalObjectStore {
    name: String,
    root: PathBuf,
    url_prefix: String,
}

impl LocalObjectStore {
    /// Creates a local object store rooted at `root`, minting URLs under
    /// `file://<root>/`.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let url_prefix = format!("file://{}/", root.display());
        Self { name: name.into(), root, url_prefix }
    }

    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_key(key)?))
    }

    fn url_to_key<'a>(&self, url: &'a str) -> Result<&'a str> {
        url.strip_prefix(&self.url_prefix).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(PathBuf::from(url))))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    async fn put(&self, data: &[u8]) -> Result<String> {
        let key = content_key(data);
        let path = self.key_to_path(&key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(ErrorKind::from)?;
        }
        tokio::fs::write(&path, data).await.map_err(ErrorKind::from)?;
        Ok(format!("{}{key}", self.url_prefix))
    }

    async fn exists(&self, url: &str) -> Result<bool> {
        let key = self.url_to_key(url)?;
        let path = self.key_to_path(key)?;
        Ok(tokio::fs::try_exists(&path).await.map_err(ErrorKind::from)?)
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let key = self.url_to_key(url)?;
        let path = self.key_to_path(key)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                exn::Exn::from(ErrorKind::NotFound(path))
            } else {
                exn::Exn::from(ErrorKind::from(e))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = LocalObjectStore::new("local", dir.path());
        let url = store.put(b"hello world").await.expect("put succeeds");
        assert!(url.starts_with(&store.url_prefix));
        assert!(store.exists(&url).await.expect("exists succeeds"));
        assert_eq!(store.get(&url).await.expect("get succeeds"), b"hello world");
    }

    #[tokio::test]
    async fn putting_identical_bytes_twice_returns_the_same_url() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = LocalObjectStore::new("local", dir.path());
        let first = store.put(b"same").await.expect("first put succeeds");
        let second = store.put(b"same").await.expect("second put succeeds");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = LocalObjectStore::new("local", dir.path());
        let missing_url = format!("{}ab/cdef", store.url_prefix());
        assert!(!store.exists(&missing_url).await.expect("exists succeeds"));
        assert!(store.get(&missing_url).await.is_err());
    }
}
