/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// SHARE POLICY DEFAULTS
// =============================================================================

/// Shortest share duration a caller can end up with, in days
pub const DEFAULT_SHARE_MIN_DAYS: i64 = 1;

/// Longest share duration a caller can end up with, in days
pub const DEFAULT_SHARE_MAX_DAYS: i64 = 30;

/// Upper bound accepted for SHARE_MAX_DAYS (about ten years)
pub const SHARE_DAYS_CEILING: i64 = 3650;

/// Share duration used when the caller does not ask for one
pub const DEFAULT_SHARE_DAYS: i64 = 7;

/// Largest declared upload size accepted at slot creation (1 GB)
pub const DEFAULT_MAX_UPLOAD_SIZE: i64 = 1_000_000_000;

/// Extensions refused at slot creation
pub const DEFAULT_FORBIDDEN_EXTENSIONS: &[&str] = &["exe", "bat", "sh"];

/// Object key prefix for uploaded files
pub const DEFAULT_UPLOAD_PREFIX: &str = "uploads";
