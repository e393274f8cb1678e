//! MinIO/S3-compatible storage client
//!
//! Signs direct upload and download URLs for MinIO or any S3-compatible
//! storage service. Uses rust-s3 crate for lightweight S3 operations.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderValue};
use chrono::{Duration, Utc};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::{SignedUrl, StorageError, StorageGateway};
use crate::core::config::MinIOConfig;

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    /// Bucket handle on the internal endpoint, for bucket management
    bucket: Box<Bucket>,
    /// Bucket handle on the public endpoint, for signing client URLs
    presign_bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    presigned_url_expiry_secs: u32,
    endpoint: String,
    public_endpoint: String,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration
    ///
    /// Presigned URLs embed the host they were signed for, so they are signed
    /// against `public_endpoint` (the address browsers can reach) while bucket
    /// management goes through `endpoint`.
    pub fn new(config: MinIOConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| {
            StorageError::Unavailable(format!("Failed to create MinIO credentials: {}", e))
        })?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let public_region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.public_endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StorageError::Unavailable(format!("Failed to create bucket: {}", e)))?;
        let mut presign_bucket = Bucket::new(&config.bucket, public_region, credentials.clone())
            .map_err(|e| StorageError::Unavailable(format!("Failed to create bucket: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();
        presign_bucket.set_path_style();

        info!(
            "MinIO client initialized for endpoint: {}, public endpoint: {}, bucket: {}",
            config.endpoint,
            config.public_endpoint,
            bucket.name()
        );

        Ok(Self {
            bucket,
            presign_bucket,
            region,
            credentials,
            presigned_url_expiry_secs: config.presigned_url_expiry_secs,
            endpoint: config.endpoint,
            public_endpoint: config.public_endpoint,
        })
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> Result<(), StorageError> {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket.name());
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}' via {}: {}. Assuming it exists.",
                        self.bucket.name(),
                        self.endpoint,
                        e
                    );
                }
                Ok(())
            }
        }
    }

    /// Get the bucket name
    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    fn signed(&self, key: &str, url: String) -> SignedUrl {
        debug!(
            "Presigned '{}' on {} for {}s",
            key, self.public_endpoint, self.presigned_url_expiry_secs
        );
        SignedUrl {
            url,
            expires_at: Utc::now() + Duration::seconds(i64::from(self.presigned_url_expiry_secs)),
        }
    }
}

/// `response-content-disposition` override so the object downloads under its original name
fn content_disposition_query(filename: &str) -> HashMap<String, String> {
    let encoded = urlencoding::encode(filename);
    let mut queries = HashMap::new();
    queries.insert(
        "response-content-disposition".to_string(),
        format!("attachment; filename*=UTF-8''{}", encoded),
    );
    queries
}

#[async_trait]
impl StorageGateway for MinIOClient {
    async fn presign_put(
        &self,
        storage_key: &str,
        content_type: &str,
    ) -> Result<SignedUrl, StorageError> {
        // Signed so the upload must carry the declared Content-Type
        let value = HeaderValue::from_str(content_type).map_err(|e| StorageError::Presign {
            key: storage_key.to_string(),
            reason: format!("invalid content type '{}': {}", content_type, e),
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, value);

        let url = self
            .presign_bucket
            .presign_put(
                storage_key,
                self.presigned_url_expiry_secs,
                Some(headers),
                None,
            )
            .await
            .map_err(|e| StorageError::Presign {
                key: storage_key.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Upload URL issued for '{}' ({})", storage_key, content_type);
        Ok(self.signed(storage_key, url))
    }

    async fn presign_get(
        &self,
        storage_key: &str,
        filename: Option<&str>,
    ) -> Result<SignedUrl, StorageError> {
        let queries = filename.map(content_disposition_query);

        let url = self
            .presign_bucket
            .presign_get(storage_key, self.presigned_url_expiry_secs, queries)
            .await
            .map_err(|e| StorageError::Presign {
                key: storage_key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(self.signed(storage_key, url))
    }
}
