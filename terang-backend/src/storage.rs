//! Object storage contract.

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;

/// Bucketed blob storage with public URLs.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` as `bucket/name`. Existing objects are not overwritten.
    async fn upload(&self, bucket: &str, name: &str, data: Bytes, content_type: &str)
    -> Result<()>;

    /// Public URL of `bucket/name`. Does not check existence.
    fn public_url(&self, bucket: &str, name: &str) -> String;

    async fn remove(&self, bucket: &str, names: &[String]) -> Result<()>;
}
