use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error};

use super::{FileRecordStore, StoreError};
use crate::features::files::models::{DownloadToken, FileFilter, FileRecord};
use crate::shared::types::{Page, PageRequest};

const RECORD_COLUMNS: &str = "token, owner_id, filename, content_type, size, storage_key, \
                              created_at, expires_at, deleted_at";

/// Postgres-backed record store
pub struct PgFileRecordStore {
    pool: PgPool,
}

impl PgFileRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Extra predicate for a listing filter; `$2` is bound to "now"
    fn filter_clause(filter: FileFilter) -> &'static str {
        match filter {
            FileFilter::All => "",
            FileFilter::Active => "AND expires_at > $2",
            FileFilter::Expired => "AND expires_at <= $2",
        }
    }
}

#[async_trait]
impl FileRecordStore for PgFileRecordStore {
    async fn insert(&self, record: &FileRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO file_records (
                token, owner_id, filename, content_type, size, storage_key,
                created_at, expires_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&record.token)
        .bind(&record.owner_id)
        .bind(&record.filename)
        .bind(&record.content_type)
        .bind(record.size)
        .bind(&record.storage_key)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert file record: {:?}", e);
            StoreError::from(e)
        })?;

        debug!("File record inserted: key={}", record.storage_key);
        Ok(())
    }

    async fn find_by_token(&self, token: &DownloadToken) -> Result<Option<FileRecord>, StoreError> {
        let sql = format!("SELECT {} FROM file_records WHERE token = $1", RECORD_COLUMNS);

        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get file record by token: {:?}", e);
                StoreError::from(e)
            })?;

        Ok(record)
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        filter: FileFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<FileRecord>, StoreError> {
        let clause = Self::filter_clause(filter);

        // `$2` is referenced only by some filters; cast keeps its type known either way
        let count_sql = format!(
            r#"
            SELECT COUNT(*) FROM file_records
            WHERE owner_id = $1 AND deleted_at IS NULL AND $2::timestamptz IS NOT NULL {}
            "#,
            clause
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(owner_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to count file records: {:?}", e);
                StoreError::from(e)
            })?;

        let list_sql = format!(
            r#"
            SELECT {} FROM file_records
            WHERE owner_id = $1 AND deleted_at IS NULL AND $2::timestamptz IS NOT NULL {}
            ORDER BY created_at DESC, token DESC
            OFFSET $3 LIMIT $4
            "#,
            RECORD_COLUMNS, clause
        );
        let items = sqlx::query_as::<_, FileRecord>(&list_sql)
            .bind(owner_id)
            .bind(now)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to list file records: {:?}", e);
                StoreError::from(e)
            })?;

        Ok(Page {
            items,
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn soft_delete(
        &self,
        token: &DownloadToken,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Single conditional update: matches only the owner's row, keeps an existing marker
        let result = sqlx::query(
            r#"
            UPDATE file_records
            SET deleted_at = COALESCE(deleted_at, $3)
            WHERE token = $1 AND owner_id = $2
            "#,
        )
        .bind(token)
        .bind(owner_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to soft delete file record: {:?}", e);
            StoreError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFoundOrNotOwner);
        }

        Ok(())
    }
}
