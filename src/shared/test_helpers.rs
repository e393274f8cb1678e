#[cfg(test)]
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration as StdDuration,
};

#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use chrono::{DateTime, Duration, Utc};

#[cfg(test)]
use crate::core::error::AppError;
#[cfg(test)]
use crate::features::auth::{IdentityProvider, Principal};
#[cfg(test)]
use crate::features::files::dtos::CreateUploadSlotDto;
#[cfg(test)]
use crate::features::files::models::{DownloadToken, FileRecord};
#[cfg(test)]
use crate::modules::storage::{SignedUrl, StorageError, StorageGateway};
#[cfg(test)]
use crate::shared::clock::Clock;

/// Active record created at `created_at`, shared for 7 days
#[cfg(test)]
pub fn sample_record(token: &str, owner_id: Option<&str>, created_at: DateTime<Utc>) -> FileRecord {
    FileRecord {
        token: DownloadToken::new(token),
        owner_id: owner_id.map(str::to_string),
        filename: "doc.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        size: 1024,
        storage_key: format!("uploads/{}", token),
        created_at,
        expires_at: created_at + Duration::days(7),
        deleted_at: None,
    }
}

#[cfg(test)]
pub fn upload_request(filename: &str, size: i64, requested_days: Option<i64>) -> CreateUploadSlotDto {
    CreateUploadSlotDto {
        filename: filename.to_string(),
        content_type: "application/pdf".to_string(),
        size,
        requested_days,
    }
}

/// Clock that only moves when told to
#[cfg(test)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Storage gateway returning deterministic URLs, with switchable failure and latency
#[cfg(test)]
#[derive(Default)]
pub struct FakeStorageGateway {
    failing: AtomicBool,
    delay: Mutex<Option<StdDuration>>,
    puts: AtomicUsize,
}

#[cfg(test)]
impl FakeStorageGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_calls(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: StdDuration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    async fn sign(&self, method: &str, storage_key: &str) -> Result<SignedUrl, StorageError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage offline".to_string()));
        }
        Ok(SignedUrl {
            url: format!("https://storage.test/{}/{}?sig={}", method, storage_key, method),
            expires_at: Utc::now() + Duration::minutes(10),
        })
    }
}

#[cfg(test)]
#[async_trait]
impl StorageGateway for FakeStorageGateway {
    async fn presign_put(
        &self,
        storage_key: &str,
        _content_type: &str,
    ) -> Result<SignedUrl, StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.sign("put", storage_key).await
    }

    async fn presign_get(
        &self,
        storage_key: &str,
        _filename: Option<&str>,
    ) -> Result<SignedUrl, StorageError> {
        self.sign("get", storage_key).await
    }
}

/// Identity provider accepting a fixed set of bearer tokens
#[cfg(test)]
#[derive(Default)]
pub struct StaticIdentityProvider {
    principals: HashMap<String, Principal>,
}

#[cfg(test)]
impl StaticIdentityProvider {
    /// Each owner id is also its own bearer token
    pub fn with_owners(owners: &[&str]) -> Arc<dyn IdentityProvider> {
        let principals = owners
            .iter()
            .map(|owner| (owner.to_string(), Principal::new(*owner)))
            .collect();
        Arc::new(Self { principals })
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self, bearer_token: &str) -> Result<Principal, AppError> {
        self.principals
            .get(bearer_token)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired access token".to_string()))
    }
}
