use base64::prelude::*;
use rand_core::{OsRng, RngCore};
use tracing::error;

use crate::features::files::errors::TransferError;
use crate::features::files::models::DownloadToken;

/// Random bytes per token (256 bits)
const TOKEN_BYTES: usize = 32;

/// Issues download tokens from the operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    pub fn new() -> Self {
        Self
    }

    /// Issue a fresh token. Fails instead of degrading if OS randomness is unavailable.
    pub fn issue(&self) -> Result<DownloadToken, TransferError> {
        issue_with(&mut OsRng)
    }
}

/// Draw a token from `rng`, URL-safe base64 without padding (43 chars)
fn issue_with<R: RngCore>(rng: &mut R) -> Result<DownloadToken, TransferError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.try_fill_bytes(&mut bytes).map_err(|e| {
        error!("Randomness source failed while issuing token: {}", e);
        TransferError::EntropyUnavailable(e.to_string())
    })?;

    Ok(DownloadToken::new(BASE64_URL_SAFE_NO_PAD.encode(bytes)))
}
