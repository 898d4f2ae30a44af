//! S3 storage provider
//! Implements BlobStore on top of the presigning client

use async_trait::async_trait;
use std::time::Duration;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::storage::BlobStore;

use super::client::Client;

/// Amazon S3 (or compatible) storage provider
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let mut client = Client::new(
            &config.access_key_id,
            &config.secret_access_key,
            &config.bucket,
            &config.region,
        );
        if let Some(token) = &config.session_token {
            client = client.with_session_token(token);
        }
        if let Some(endpoint) = &config.endpoint {
            client = client.with_endpoint(endpoint)?;
        }
        Ok(Self { client })
    }
}

#[async_trait]
impl BlobStore for S3Storage {
    async fn delete(&self, key: &str) -> Result<()> {
        let res = self.client.delete_object(key).await;

        if !res.is_success() {
            // Some S3-compatible servers report missing keys instead of 204
            if res.is_not_found() {
                return Ok(());
            }
            return Err(AppError::Storage(format!("S3 delete failed: {}", res)));
        }

        tracing::debug!("Deleted from S3: {}", key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let res = self.client.head_object(key).await;

        if res.is_success() {
            return Ok(true);
        }
        if res.is_not_found() {
            return Ok(false);
        }
        Err(AppError::Storage(format!("S3 head failed: {}", res)))
    }

    async fn upload_url(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires: Duration,
    ) -> Result<String> {
        Ok(self
            .client
            .get_presigned_upload_url(key, content_type, content_length, expires))
    }

    async fn download_url(&self, key: &str, expires: Duration) -> Result<String> {
        Ok(self.client.get_presigned_download_url(key, expires))
    }

    fn storage_type(&self) -> &'static str {
        "s3"
    }
}
