//! Persistence for file records
//!
//! Token uniqueness on `insert` and the ownership check-and-set on
//! `soft_delete` are atomic inside each implementation; callers never lock.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::features::files::models::{DownloadToken, FileFilter, FileRecord};
use crate::shared::types::{Page, PageRequest};

pub use memory::InMemoryFileRecordStore;
pub use postgres::PgFileRecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Token already exists: {0}")]
    DuplicateToken(String),

    /// Same error whether the token is unknown or owned by someone else
    #[error("File not found")]
    NotFoundOrNotOwner,

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateToken(db.message().to_string())
            }
            _ => StoreError::Unavailable(e.to_string()),
        }
    }
}

#[async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Persist a new record; fails if its token was ever used before
    async fn insert(&self, record: &FileRecord) -> Result<(), StoreError>;

    /// Lookup by token with no ownership check; the token is the capability
    async fn find_by_token(&self, token: &DownloadToken) -> Result<Option<FileRecord>, StoreError>;

    /// Non-deleted records of `owner_id`, newest first, `filter` evaluated at `now`
    async fn list_by_owner(
        &self,
        owner_id: &str,
        filter: FileFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<FileRecord>, StoreError>;

    /// Mark the record deleted at `now` if `owner_id` owns it.
    ///
    /// Already-deleted records owned by the caller succeed and keep their
    /// original `deleted_at`.
    async fn soft_delete(
        &self,
        token: &DownloadToken,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
