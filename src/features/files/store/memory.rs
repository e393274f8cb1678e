use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{FileRecordStore, StoreError};
use crate::features::files::models::{DownloadToken, FileFilter, FileRecord};
use crate::shared::types::{Page, PageRequest};

/// Process-local record store, keyed by token.
///
/// Rows are never removed, so a token stays reserved after soft deletion.
#[derive(Default)]
pub struct InMemoryFileRecordStore {
    records: RwLock<HashMap<DownloadToken, FileRecord>>,
}

impl InMemoryFileRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(record: &FileRecord, owner_id: &str, filter: FileFilter, now: DateTime<Utc>) -> bool {
        if !record.is_owned_by(owner_id) || record.is_deleted() {
            return false;
        }
        match filter {
            FileFilter::All => true,
            FileFilter::Active => now < record.expires_at,
            FileFilter::Expired => now >= record.expires_at,
        }
    }
}

#[async_trait]
impl FileRecordStore for InMemoryFileRecordStore {
    async fn insert(&self, record: &FileRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.token) {
            return Err(StoreError::DuplicateToken(record.token.to_string()));
        }
        records.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &DownloadToken) -> Result<Option<FileRecord>, StoreError> {
        Ok(self.records.read().await.get(token).cloned())
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        filter: FileFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<FileRecord>, StoreError> {
        let records = self.records.read().await;

        let mut matching: Vec<&FileRecord> = records
            .values()
            .filter(|r| Self::matches(r, owner_id, filter, now))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.token.as_str().cmp(a.token.as_str()))
        });

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .cloned()
            .collect();

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
        let mut records = self.records.write().await;
        match records.get_mut(token) {
            Some(record) if record.is_owned_by(owner_id) => {
                record.deleted_at.get_or_insert(now);
                Ok(())
            }
            _ => Err(StoreError::NotFoundOrNotOwner),
        }
    }
}
