use thiserror::Error;

use crate::features::files::store::StoreError;
use crate::modules::storage::StorageError;

/// Failure kinds of the transfer workflow
#[derive(Debug, Error)]
pub enum TransferError {
    /// The OS randomness source failed; tokens cannot be issued safely
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// A freshly issued token collided with an existing record
    #[error("Duplicate token: {0}")]
    DuplicateToken(String),

    /// The token does not exist or belongs to another principal
    #[error("File not found")]
    NotFoundOrNotOwner,

    #[error("No file for token")]
    NotFound,

    /// The record exists but is deleted or past its expiry
    #[error("File expired")]
    Expired,

    /// Storage gateway or record store failed or timed out; safe to retry
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Authentication required")]
    AuthenticationRequired,
}

impl From<StorageError> for TransferError {
    fn from(e: StorageError) -> Self {
        TransferError::UpstreamUnavailable(e.to_string())
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateToken(token) => TransferError::DuplicateToken(token),
            StoreError::NotFoundOrNotOwner => TransferError::NotFoundOrNotOwner,
            StoreError::Unavailable(msg) => TransferError::UpstreamUnavailable(msg),
        }
    }
}
