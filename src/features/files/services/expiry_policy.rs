use chrono::{DateTime, Duration, Utc};

use crate::core::config::TransferConfig;
use crate::features::files::models::{FileRecord, FileStatus};
use crate::shared::constants::SHARE_DAYS_CEILING;

/// Share-duration policy.
///
/// Requested durations are clamped into `[min_days, max_days]`, never
/// rejected: asking for 500 days on a 30-day policy yields 30 days. This is
/// the intended behaviour of the upload form, not a missing validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    min_days: i64,
    max_days: i64,
    default_days: i64,
}

impl ExpiryPolicy {
    pub fn new(min_days: i64, max_days: i64, default_days: i64) -> Result<Self, String> {
        if min_days < 1 {
            return Err(format!("SHARE_MIN_DAYS must be at least 1, got {}", min_days));
        }
        if max_days > SHARE_DAYS_CEILING {
            return Err(format!(
                "SHARE_MAX_DAYS must not exceed {}, got {}",
                SHARE_DAYS_CEILING, max_days
            ));
        }
        if max_days < min_days {
            return Err(format!(
                "SHARE_MAX_DAYS ({}) must not be below SHARE_MIN_DAYS ({})",
                max_days, min_days
            ));
        }
        Ok(Self {
            min_days,
            max_days,
            default_days,
        })
    }

    pub fn from_config(config: &TransferConfig) -> Result<Self, String> {
        Self::new(config.min_days, config.max_days, config.default_days)
    }

    /// Effective share duration in days for a request
    pub fn clamp_days(&self, requested_days: Option<i64>) -> i64 {
        requested_days
            .unwrap_or(self.default_days)
            .clamp(self.min_days, self.max_days)
    }

    /// `now` plus the clamped duration, saturating at the latest representable instant
    pub fn compute_expiry(&self, now: DateTime<Utc>, requested_days: Option<i64>) -> DateTime<Utc> {
        Duration::try_days(self.clamp_days(requested_days))
            .and_then(|share| now.checked_add_signed(share))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Active iff not deleted and `now` is strictly before `expires_at`
    pub fn is_active(&self, record: &FileRecord, now: DateTime<Utc>) -> bool {
        record.deleted_at.is_none() && now < record.expires_at
    }

    pub fn status(&self, record: &FileRecord, now: DateTime<Utc>) -> FileStatus {
        if record.is_deleted() {
            FileStatus::Deleted
        } else if self.is_active(record, now) {
            FileStatus::Active
        } else {
            FileStatus::Expired
        }
    }
}
