//! S3-compatible object store.
//!
//! Backs [`ObjectStore`] with an S3 bucket, suitable for AWS S3 and
//! S3-compatible providers (Backblaze B2, Tigris, MinIO) alike.

use crate::ObjectStore;
use crate::content::content_key;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    primitives::ByteStream,
};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

pub struct S3ObjectStore {
    name: String,
    client: Client,
    bucket: String,
    url_prefix: String,
    rate_limiter: Arc<Semaphore>,
}

impl S3ObjectStore {
    /// Creates a new S3-backed object store.
    ///
    /// `endpoint` overrides the default AWS endpoint for S3-compatible
    /// providers; leave it `None` to talk to AWS S3 directly.
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let bucket = bucket.into();
        let region = Region::new(region.into());
        let credentials = Credentials::new(key_id, key_secret, None, None, "snack-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            .force_path_style(true);
        if let Some(endpoint) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint);
        }
        let client = Client::from_conf(config_builder.build());
        let url_prefix = format!("https://{bucket}.s3.amazonaws.com/");
        Self { name: name.into(), client, bucket, url_prefix, rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)) }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    async fn put(&self, data: &[u8]) -> Result<String> {
        let _permit = self.rate_limiter.acquire().await.expect("semaphore is never closed");
        let key = content_key(data);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|err| exn::Exn::from(ErrorKind::Network(err.to_string())))?;
        Ok(format!("{}{key}", self.url_prefix))
    }

    async fn exists(&self, url: &str) -> Result<bool> {
        let _permit = self.rate_limiter.acquire().await.expect("semaphore is never closed");
        let Some(key) = url.strip_prefix(&self.url_prefix) else { return Ok(false) };
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(exn::Exn::from(ErrorKind::Network(err.to_string()))),
        }
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let _permit = self.rate_limiter.acquire().await.expect("semaphore is never closed");
        let key = url.strip_prefix(&self.url_prefix).unwrap_or(url);
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| exn::Exn::from(ErrorKind::Network(err.to_string())))?;
        let bytes = object.body.collect().await.map_err(|err| exn::Exn::from(ErrorKind::Network(err.to_string())))?;
        Ok(bytes.into_bytes().to_vec())
    }
}
