use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::files::models::{DownloadToken, FileFilter, FileStatus};
use crate::shared::constants::DEFAULT_PAGE_SIZE;
use crate::shared::types::PageRequest;
use crate::shared::validation::{file_extension, CONTENT_TYPE_REGEX, FILENAME_REGEX};

/// Request DTO for an upload slot
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadSlotDto {
    /// Name the file will be downloaded under
    #[validate(length(min = 1, max = 255, message = "filename must be 1 to 255 characters"))]
    #[validate(regex(
        path = *FILENAME_REGEX,
        message = "filename must not contain path separators or control characters"
    ))]
    #[schema(example = "doc.pdf")]
    pub filename: String,
    /// Declared MIME type (not verified against the uploaded bytes)
    #[validate(regex(path = *CONTENT_TYPE_REGEX, message = "contentType must be a MIME type"))]
    #[schema(example = "application/pdf")]
    pub content_type: String,
    /// Declared size in bytes (not verified against the uploaded bytes)
    #[validate(range(min = 0, message = "size must not be negative"))]
    #[schema(example = 1024)]
    pub size: i64,
    /// Share duration in days; clamped into the configured bounds
    #[serde(default, alias = "expirationDays")]
    #[schema(example = 7)]
    pub requested_days: Option<i64>,
}

impl CreateUploadSlotDto {
    /// Lowercased extension if it appears in `forbidden`
    pub fn forbidden_extension(&self, forbidden: &[String]) -> Option<String> {
        file_extension(&self.filename).filter(|ext| forbidden.iter().any(|f| f == ext))
    }
}

/// Response DTO for an upload slot
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlotResponseDto {
    /// Presigned URL to PUT the file bytes to
    pub upload_url: String,
    /// Download token to share
    #[schema(value_type = String)]
    pub token: DownloadToken,
    /// Instant the share link stops working
    pub expires_at: DateTime<Utc>,
}

/// Response DTO for a resolved download
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponseDto {
    /// Presigned URL to GET the file bytes from
    pub download_url: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One of the caller's files
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileSummaryDto {
    #[schema(value_type = String)]
    pub token: DownloadToken,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: FileStatus,
}

/// Query params for listing the caller's files
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct FileListQuery {
    /// Page number (1-indexed, default: 1)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Number of items per page (default: 10, max: 100)
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// all (default), active or expired
    #[serde(default)]
    #[param(inline)]
    pub filter: FileFilter,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl FileListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_page(self.page, self.page_size)
    }
}
