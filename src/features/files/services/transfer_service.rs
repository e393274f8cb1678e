use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::features::files::dtos::{
    CreateUploadSlotDto, DownloadResponseDto, FileSummaryDto, UploadSlotResponseDto,
};
use crate::features::files::errors::TransferError;
use crate::features::files::models::{DownloadToken, FileFilter, FileRecord, FileStatus};
use crate::features::files::services::{ExpiryPolicy, TokenIssuer};
use crate::features::files::store::FileRecordStore;
use crate::modules::storage::StorageGateway;
use crate::shared::clock::Clock;
use crate::shared::types::{Page, PageRequest};

pub type Result<T> = std::result::Result<T, TransferError>;

/// Orchestrates presigned uploads and downloads, listing and deletion.
///
/// A record is `Active` while `ExpiryPolicy::is_active` holds, becomes
/// `Expired` by the clock alone, and `Deleted` only through `delete_owned`.
/// There is no undelete and no renewal.
pub struct TransferService {
    store: Arc<dyn FileRecordStore>,
    storage: Arc<dyn StorageGateway>,
    issuer: TokenIssuer,
    policy: ExpiryPolicy,
    clock: Arc<dyn Clock>,
    upload_prefix: String,
    allow_anonymous_upload: bool,
    upstream_timeout: Duration,
    upload_rules: UploadRules,
}

/// Limits checked on upload requests before a slot is issued
#[derive(Debug, Clone)]
pub struct UploadRules {
    pub max_upload_size: i64,
    /// Lowercased extensions without the dot
    pub forbidden_extensions: Vec<String>,
}

impl UploadRules {
    pub fn check(&self, request: &CreateUploadSlotDto) -> std::result::Result<(), String> {
        if request.size > self.max_upload_size {
            return Err(format!(
                "size must not exceed {} bytes",
                self.max_upload_size
            ));
        }
        if let Some(ext) = request.forbidden_extension(&self.forbidden_extensions) {
            return Err(format!("files with extension '.{}' are not allowed", ext));
        }
        Ok(())
    }
}

/// Wiring options that do not come from a collaborator
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub upload_prefix: String,
    pub allow_anonymous_upload: bool,
    pub upstream_timeout: Duration,
    pub upload_rules: UploadRules,
}

impl TransferService {
    pub fn new(
        store: Arc<dyn FileRecordStore>,
        storage: Arc<dyn StorageGateway>,
        policy: ExpiryPolicy,
        clock: Arc<dyn Clock>,
        options: TransferOptions,
    ) -> Self {
        Self {
            store,
            storage,
            issuer: TokenIssuer::new(),
            policy,
            clock,
            upload_prefix: options.upload_prefix,
            allow_anonymous_upload: options.allow_anonymous_upload,
            upstream_timeout: options.upstream_timeout,
            upload_rules: options.upload_rules,
        }
    }

    pub fn upload_rules(&self) -> &UploadRules {
        &self.upload_rules
    }

    /// Run an upstream call, turning an elapsed deadline into `UpstreamUnavailable`
    async fn upstream<T, E, F>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        TransferError: From<E>,
    {
        match tokio::time::timeout(self.upstream_timeout, call).await {
            Ok(result) => result.map_err(TransferError::from),
            Err(_) => {
                warn!("{} timed out after {:?}", what, self.upstream_timeout);
                Err(TransferError::UpstreamUnavailable(format!(
                    "{} timed out",
                    what
                )))
            }
        }
    }

    fn storage_key(&self, token: &DownloadToken) -> String {
        format!("{}/{}", self.upload_prefix, token)
    }

    /// Issue an upload slot: signed PUT URL, token and expiry.
    ///
    /// The record is inserted only after the PUT URL is signed, so a storage
    /// failure never leaves an orphaned record.
    pub async fn create_upload_slot(
        &self,
        owner_id: Option<&str>,
        request: CreateUploadSlotDto,
    ) -> Result<UploadSlotResponseDto> {
        if owner_id.is_none() && !self.allow_anonymous_upload {
            return Err(TransferError::AuthenticationRequired);
        }

        let token = self.issuer.issue()?;
        let storage_key = self.storage_key(&token);

        let upload_url = self
            .upstream(
                "presign PUT",
                self.storage
                    .presign_put(&storage_key, &request.content_type),
            )
            .await?;

        let now = self.clock.now();
        let record = FileRecord {
            token: token.clone(),
            owner_id: owner_id.map(str::to_string),
            filename: request.filename,
            content_type: request.content_type,
            size: request.size,
            storage_key,
            created_at: now,
            expires_at: self.policy.compute_expiry(now, request.requested_days),
            deleted_at: None,
        };

        // Not bounded by `upstream_timeout`: abandoning a committed insert would
        // report failure for a record that still exists. The pool acquire timeout
        // still applies.
        match self.store.insert(&record).await.map_err(TransferError::from) {
            Ok(()) => {}
            Err(TransferError::DuplicateToken(detail)) => {
                error!(
                    "Invariant violation: freshly issued token already stored ({}); aborting upload slot",
                    detail
                );
                return Err(TransferError::DuplicateToken(detail));
            }
            Err(e) => return Err(e),
        }

        info!(
            "Upload slot issued: key={}, owner={}, size={}, expires_at={}, put_url_valid_until={}",
            record.storage_key,
            record.owner_id.as_deref().unwrap_or("anonymous"),
            record.size,
            record.expires_at,
            upload_url.expires_at
        );

        Ok(UploadSlotResponseDto {
            upload_url: upload_url.url,
            token,
            expires_at: record.expires_at,
        })
    }

    /// Resolve a token to a signed download URL. Token possession is the only check.
    pub async fn resolve_download(&self, token: &DownloadToken) -> Result<DownloadResponseDto> {
        let record = self
            .upstream("find record", self.store.find_by_token(token))
            .await?
            .ok_or_else(|| {
                info!("Download refused: unknown token");
                TransferError::NotFound
            })?;

        let now = self.clock.now();
        match self.policy.status(&record, now) {
            FileStatus::Active => {}
            FileStatus::Deleted => {
                info!("Download refused: key={} is deleted", record.storage_key);
                return Err(TransferError::Expired);
            }
            FileStatus::Expired => {
                info!(
                    "Download refused: key={} expired at {}",
                    record.storage_key, record.expires_at
                );
                return Err(TransferError::Expired);
            }
        }

        let download_url = self
            .upstream(
                "presign GET",
                self.storage
                    .presign_get(&record.storage_key, Some(&record.filename)),
            )
            .await?;

        debug!("Download resolved: key={}", record.storage_key);

        Ok(DownloadResponseDto {
            download_url: download_url.url,
            filename: record.filename,
            content_type: record.content_type,
            size: record.size,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    /// The caller's non-deleted files, newest first
    pub async fn list_owned(
        &self,
        owner_id: &str,
        filter: FileFilter,
        page: PageRequest,
    ) -> Result<Page<FileSummaryDto>> {
        let now = self.clock.now();
        let records = self
            .upstream(
                "list records",
                self.store.list_by_owner(owner_id, filter, page, now),
            )
            .await?;

        Ok(records.map(|record| FileSummaryDto {
            status: self.policy.status(&record, now),
            token: record.token,
            filename: record.filename,
            content_type: record.content_type,
            size: record.size,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }))
    }

    /// Soft-delete one of the caller's files. Repeating the call succeeds.
    pub async fn delete_owned(&self, owner_id: &str, token: &DownloadToken) -> Result<()> {
        let now = self.clock.now();
        match self
            .upstream(
                "soft delete record",
                self.store.soft_delete(token, owner_id, now),
            )
            .await
        {
            Ok(()) => {
                info!("File soft deleted by owner={}", owner_id);
                Ok(())
            }
            Err(TransferError::NotFoundOrNotOwner) => {
                debug!("Delete refused for owner={}: not found or not owner", owner_id);
                Err(TransferError::NotFoundOrNotOwner)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::store::{InMemoryFileRecordStore, StoreError};
    use crate::shared::test_helpers::{upload_request, FakeStorageGateway, ManualClock};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use fake::faker::internet::en::Username;
    use fake::Fake;
    use tokio_test::assert_ok;

    struct Harness {
        service: TransferService,
        store: Arc<InMemoryFileRecordStore>,
        storage: Arc<FakeStorageGateway>,
        clock: Arc<ManualClock>,
    }

    fn harness_with(allow_anonymous_upload: bool) -> Harness {
        harness_with_timeout(allow_anonymous_upload, Duration::from_secs(5))
    }

    fn harness_with_timeout(allow_anonymous_upload: bool, upstream_timeout: Duration) -> Harness {
        let store = Arc::new(InMemoryFileRecordStore::new());
        let storage = Arc::new(FakeStorageGateway::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = TransferService::new(
            store.clone(),
            storage.clone(),
            ExpiryPolicy::new(1, 30, 7).unwrap(),
            clock.clone(),
            TransferOptions {
                upload_prefix: "uploads".to_string(),
                allow_anonymous_upload,
                upstream_timeout,
                upload_rules: UploadRules {
                    max_upload_size: 1_000_000_000,
                    forbidden_extensions: vec!["exe".to_string()],
                },
            },
        );
        Harness {
            service,
            store,
            storage,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(false)
    }

    #[tokio::test]
    async fn test_upload_then_download_round_trip() {
        let h = harness();
        let slot = h
            .service
            .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1024, Some(7)))
            .await
            .unwrap();

        assert_eq!(slot.expires_at, h.clock.now() + ChronoDuration::days(7));
        assert!(slot.upload_url.contains(&format!("uploads/{}", slot.token)));

        let download = h.service.resolve_download(&slot.token).await.unwrap();
        assert_eq!(download.filename, "doc.pdf");
        assert_eq!(download.content_type, "application/pdf");
        assert_eq!(download.size, 1024);
        assert_eq!(download.expires_at, slot.expires_at);
        assert_eq!(download.created_at, h.clock.now());
        assert!(download.download_url.contains("get"));
    }

    #[tokio::test]
    async fn test_storage_key_is_derived_from_token() {
        let h = harness();
        let slot = h
            .service
            .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1, None))
            .await
            .unwrap();

        let record = h.store.find_by_token(&slot.token).await.unwrap().unwrap();
        assert_eq!(record.storage_key, format!("uploads/{}", slot.token));
        assert_eq!(record.owner_id.as_deref(), Some("alice"));
        assert!(record.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_requested_days_are_clamped() {
        let h = harness();
        let slot = h
            .service
            .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1, Some(500)))
            .await
            .unwrap();
        assert_eq!(slot.expires_at, h.clock.now() + ChronoDuration::days(30));

        let slot = h
            .service
            .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1, Some(0)))
            .await
            .unwrap();
        assert_eq!(slot.expires_at, h.clock.now() + ChronoDuration::days(1));
    }

    #[tokio::test]
    async fn test_anonymous_upload_requires_flag() {
        let h = harness();
        let err = h
            .service
            .create_upload_slot(None, upload_request("doc.pdf", 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::AuthenticationRequired));
        assert_eq!(h.storage.put_count(), 0);

        let h = harness_with(true);
        let slot = h
            .service
            .create_upload_slot(None, upload_request("doc.pdf", 1, None))
            .await
            .unwrap();
        let record = h.store.find_by_token(&slot.token).await.unwrap().unwrap();
        assert!(record.owner_id.is_none());
        assert_ok!(h.service.resolve_download(&slot.token).await);
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_no_record() {
        let h = harness();
        h.storage.fail_next_calls(true);

        let err = h
            .service
            .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::UpstreamUnavailable(_)));

        let listed = h
            .service
            .list_owned("alice", FileFilter::All, PageRequest::from_page(1, 10))
            .await
            .unwrap();
        assert_eq!(listed.total, 0);
    }

    #[tokio::test]
    async fn test_slow_storage_times_out_as_unavailable() {
        let h = harness_with_timeout(false, Duration::from_millis(50));
        h.storage.set_delay(Duration::from_secs(2));

        let err = h
            .service
            .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::UpstreamUnavailable(_)));

        let listed = h
            .service
            .list_owned("alice", FileFilter::All, PageRequest::from_page(1, 10))
            .await
            .unwrap();
        assert_eq!(listed.total, 0);
    }

    /// Memory store whose inserts commit and then stall
    struct SlowInsertStore {
        inner: InMemoryFileRecordStore,
        delay: Duration,
    }

    #[async_trait]
    impl FileRecordStore for SlowInsertStore {
        async fn insert(&self, record: &FileRecord) -> std::result::Result<(), StoreError> {
            self.inner.insert(record).await?;
            tokio::time::sleep(self.delay).await;
            Ok(())
        }

        async fn find_by_token(
            &self,
            token: &DownloadToken,
        ) -> std::result::Result<Option<FileRecord>, StoreError> {
            self.inner.find_by_token(token).await
        }

        async fn list_by_owner(
            &self,
            owner_id: &str,
            filter: FileFilter,
            page: PageRequest,
            now: DateTime<Utc>,
        ) -> std::result::Result<Page<FileRecord>, StoreError> {
            self.inner.list_by_owner(owner_id, filter, page, now).await
        }

        async fn soft_delete(
            &self,
            token: &DownloadToken,
            owner_id: &str,
            now: DateTime<Utc>,
        ) -> std::result::Result<(), StoreError> {
            self.inner.soft_delete(token, owner_id, now).await
        }
    }

    #[tokio::test]
    async fn test_slow_insert_still_returns_the_committed_slot() {
        let upstream_timeout = Duration::from_millis(20);
        let service = TransferService::new(
            Arc::new(SlowInsertStore {
                inner: InMemoryFileRecordStore::new(),
                delay: upstream_timeout * 5,
            }),
            Arc::new(FakeStorageGateway::new()),
            ExpiryPolicy::new(1, 30, 7).unwrap(),
            Arc::new(ManualClock::new(Utc::now())),
            TransferOptions {
                upload_prefix: "uploads".to_string(),
                allow_anonymous_upload: false,
                upstream_timeout,
                upload_rules: UploadRules {
                    max_upload_size: 1_000,
                    forbidden_extensions: vec![],
                },
            },
        );

        let slot = assert_ok!(
            service
                .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1, None))
                .await
        );
        let download = assert_ok!(service.resolve_download(&slot.token).await);
        assert_eq!(download.filename, "doc.pdf");
    }

    #[test]
    fn test_upload_rules() {
        let rules = UploadRules {
            max_upload_size: 100,
            forbidden_extensions: vec!["exe".to_string()],
        };
        assert!(rules.check(&upload_request("doc.pdf", 100, None)).is_ok());
        assert!(rules.check(&upload_request("doc.pdf", 101, None)).is_err());
        assert!(rules.check(&upload_request("setup.Exe", 1, None)).is_err());
    }

    #[tokio::test]
    async fn test_resolve_unknown_token_is_not_found() {
        let h = harness();
        let err = h
            .service
            .resolve_download(&DownloadToken::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::NotFound));
    }

    #[tokio::test]
    async fn test_resolve_after_expiry_is_expired() {
        let h = harness();
        let slot = h
            .service
            .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1, Some(1)))
            .await
            .unwrap();

        h.clock.set(slot.expires_at - ChronoDuration::seconds(1));
        assert_ok!(h.service.resolve_download(&slot.token).await);

        h.clock.set(slot.expires_at);
        let err = h.service.resolve_download(&slot.token).await.unwrap_err();
        assert!(matches!(err, TransferError::Expired));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let h = harness();
        let slot = h
            .service
            .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1, None))
            .await
            .unwrap();

        assert_ok!(h.service.delete_owned("alice", &slot.token).await);
        assert_ok!(h.service.delete_owned("alice", &slot.token).await);

        let record = h.store.find_by_token(&slot.token).await.unwrap().unwrap();
        let policy = ExpiryPolicy::new(1, 30, 7).unwrap();
        assert!(!policy.is_active(&record, h.clock.now()));
    }

    #[tokio::test]
    async fn test_delete_unknown_and_foreign_tokens_look_the_same() {
        let h = harness();
        let slot = h
            .service
            .create_upload_slot(Some("alice"), upload_request("doc.pdf", 1, None))
            .await
            .unwrap();

        let foreign = h
            .service
            .delete_owned("bob", &slot.token)
            .await
            .unwrap_err();
        let unknown = h
            .service
            .delete_owned("bob", &DownloadToken::new("never-issued"))
            .await
            .unwrap_err();

        assert!(matches!(foreign, TransferError::NotFoundOrNotOwner));
        assert!(matches!(unknown, TransferError::NotFoundOrNotOwner));
        assert_eq!(foreign.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_share_then_delete_scenario() {
        let h = harness();

        // Owner A shares doc.pdf for 7 days
        let slot = h
            .service
            .create_upload_slot(Some("owner-a"), upload_request("doc.pdf", 1024, Some(7)))
            .await
            .unwrap();
        assert_eq!(slot.expires_at, h.clock.now() + ChronoDuration::days(7));

        // B holds the token: download works, delete does not
        assert_ok!(h.service.resolve_download(&slot.token).await);
        let err = h
            .service
            .delete_owned("owner-b", &slot.token)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::NotFoundOrNotOwner));

        // A deletes; B's link stops working
        assert_ok!(h.service.delete_owned("owner-a", &slot.token).await);
        let err = h.service.resolve_download(&slot.token).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::Expired | TransferError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_list_owned_is_isolated_per_owner() {
        let h = harness();
        let owners: Vec<String> = (0..3).map(|_| Username().fake()).collect();
        let owners: Vec<String> = owners
            .into_iter()
            .enumerate()
            .map(|(i, name)| format!("{}-{}", name, i))
            .collect();

        // Same clock instant for everyone: timestamps overlap exactly
        for owner in &owners {
            for n in 0..4 {
                h.service
                    .create_upload_slot(
                        Some(owner),
                        upload_request(&format!("file-{}.txt", n), n, None),
                    )
                    .await
                    .unwrap();
            }
        }

        for owner in &owners {
            let page = h
                .service
                .list_owned(owner, FileFilter::All, PageRequest::from_page(1, 100))
                .await
                .unwrap();
            assert_eq!(page.total, 4);
            for summary in &page.items {
                let record = h.store.find_by_token(&summary.token).await.unwrap().unwrap();
                assert_eq!(record.owner_id.as_deref(), Some(owner.as_str()));
            }
        }
    }

    #[tokio::test]
    async fn test_list_owned_filters_and_reports_status() {
        let h = harness();
        let start = h.clock.now();

        let short = h
            .service
            .create_upload_slot(Some("alice"), upload_request("short.txt", 1, Some(1)))
            .await
            .unwrap();
        h.clock.set(start + ChronoDuration::hours(1));
        let long = h
            .service
            .create_upload_slot(Some("alice"), upload_request("long.txt", 1, Some(10)))
            .await
            .unwrap();
        let gone = h
            .service
            .create_upload_slot(Some("alice"), upload_request("gone.txt", 1, Some(10)))
            .await
            .unwrap();
        h.service.delete_owned("alice", &gone.token).await.unwrap();

        h.clock.set(start + ChronoDuration::days(2));
        let page = PageRequest::from_page(1, 10);

        let all = h
            .service
            .list_owned("alice", FileFilter::All, page)
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].token, long.token);
        assert_eq!(all.items[0].status, FileStatus::Active);
        assert_eq!(all.items[1].token, short.token);
        assert_eq!(all.items[1].status, FileStatus::Expired);

        let active = h
            .service
            .list_owned("alice", FileFilter::Active, page)
            .await
            .unwrap();
        assert_eq!(active.total, 1);
        assert_eq!(active.items[0].token, long.token);

        let expired = h
            .service
            .list_owned("alice", FileFilter::Expired, page)
            .await
            .unwrap();
        assert_eq!(expired.total, 1);
        assert_eq!(expired.items[0].token, short.token);
    }

    #[tokio::test]
    async fn test_concurrent_upload_slots_are_all_persisted() {
        let h = Arc::new(harness());
        let calls = (0..50).map(|i| {
            let h = Arc::clone(&h);
            async move {
                h.service
                    .create_upload_slot(Some("alice"), upload_request("f.bin", i, None))
                    .await
            }
        });

        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let listed = h
            .service
            .list_owned("alice", FileFilter::All, PageRequest::from_page(1, 100))
            .await
            .unwrap();
        assert_eq!(listed.total, 50);
    }
}
