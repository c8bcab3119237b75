//! The [`ObjectStore`] trait abstracts over where spilled files and
//! uploaded asset blobs actually live — local disk during development, S3
//! (or an S3-compatible provider) in production, or an in-memory map in
//! tests.
//!
//! # Examples
//!
//! ```
//! use snack_storage::ObjectStore;
//! use snack_storage::backend::MockObjectStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MockObjectStore::default();
//! let url = store.put(b"console.log(1)").await?;
//! assert!(url.starts_with(store.url_prefix()));
//! assert!(store.exists(&url).await?);
//! assert_eq!(store.get(&url).await?, b"console.log(1)");
//! # Ok(())
//! # }
//! ```

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalObjectStore;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockObjectStore;
#[cfg(feature = "s3")]
pub use self::s3::S3ObjectStore;

use crate::error::Result;
use async_trait::async_trait;

/// A content-addressed object store.
///
/// Implementations key objects by the content hash of their bytes (see
/// [`crate::content_key`]), so `put` is naturally idempotent: uploading the
/// same bytes twice returns the same URL without duplicating storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// A short identifier for logging, e.g. `"s3"`, `"local"`, `"mock"`.
    fn name(&self) -> &str;

    /// The URL prefix every object this store mints will carry. Used by the
    /// publication pipeline to recognize a file's contents as "already an
    /// object-store URL" rather than literal source.
    fn url_prefix(&self) -> &str;

    /// Uploads `data`, returning its canonical URL. Uploading identical
    /// bytes more than once is safe and returns the same URL both times.
    async fn put(&self, data: &[u8]) -> Result<String>;

    /// Returns `true` if `url` (as returned by a prior [`put`](Self::put))
    /// is present in this store.
    async fn exists(&self, url: &str) -> Result<bool>;

    /// Downloads the bytes behind `url`.
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}
