//! Storage module for direct client transfers
//!
//! Issues time-limited signed URLs so clients PUT and GET object bytes
//! straight against MinIO or any S3-compatible storage service.

mod minio_client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use minio_client::MinIOClient;

/// A presigned URL and the instant it stops being accepted by storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to presign URL for '{key}': {reason}")]
    Presign { key: String, reason: String },

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Signs direct PUT/GET requests against object storage
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Signed URL for uploading `content_type` bytes at `storage_key`
    async fn presign_put(
        &self,
        storage_key: &str,
        content_type: &str,
    ) -> Result<SignedUrl, StorageError>;

    /// Signed URL for downloading `storage_key`, saved under `filename` when given
    async fn presign_get(
        &self,
        storage_key: &str,
        filename: Option<&str>,
    ) -> Result<SignedUrl, StorageError>;
}
