//! In-memory object store for testing.

use crate::ObjectStore;
use crate::content::content_key;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory object store for testing. Objects are stored in a `HashMap`
/// behind a [`RwLock`], so every trait method operates on `&self` without
/// external synchronization.
pub struct MockObjectStore {
    name: String,
    url_prefix: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self { name: "mock".to_string(), url_prefix: "mock://snack-objects/".to_string(), objects: RwLock::new(HashMap::new()) }
    }
}

impl MockObjectStore {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    async fn put(&self, data: &[u8]) -> Result<String> {
        let key = content_key(data);
        self.objects.write().await.insert(key.clone(), data.to_vec());
        Ok(format!("{}{key}", self.url_prefix))
    }

    async fn exists(&self, url: &str) -> Result<bool> {
        let Some(key) = url.strip_prefix(&self.url_prefix) else { return Ok(false) };
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let key = url.strip_prefix(&self.url_prefix).unwrap_or(url);
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(std::path::PathBuf::from(url))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MockObjectStore::default();
        let url = store.put(b"payload").await.expect("put succeeds");
        assert!(store.exists(&url).await.expect("exists succeeds"));
        assert_eq!(store.get(&url).await.expect("get succeeds"), b"payload");
    }

    #[tokio::test]
    async fn putting_identical_bytes_twice_returns_the_same_url() {
        let store = MockObjectStore::default();
        let first = store.put(b"same").await.expect("first put succeeds");
        let second = store.put(b"same").await.expect("second put succeeds");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = MockObjectStore::default();
        assert!(!store.exists("mock://snack-objects/nope").await.expect("exists succeeds"));
        assert!(store.get("mock://snack-objects/nope").await.is_err());
    }
}
