use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Object storage holding the file bytes, addressed by file name
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Delete an object. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Get a signed URL the client can PUT the object to.
    /// The upload must carry exactly this content type and length.
    async fn upload_url(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires: Duration,
    ) -> Result<String>;

    /// Get a signed URL for downloading as an attachment
    async fn download_url(&self, key: &str, expires: Duration) -> Result<String>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}
