use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Opaque download capability. Holding it is the only requirement for a download.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct DownloadToken(String);

impl DownloadToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DownloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Database model for a shared file
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FileRecord {
    pub token: DownloadToken,
    /// `None` only for anonymous uploads
    pub owner_id: Option<String>,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id.as_deref() == Some(owner_id)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Lifecycle state as seen at a given instant. Only `deleted_at` is stored;
/// expiry is derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Active,
    Expired,
    Deleted,
}

/// Listing filter over an owner's files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileFilter {
    #[default]
    All,
    Active,
    Expired,
}
