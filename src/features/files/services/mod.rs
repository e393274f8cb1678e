mod expiry_policy;
mod token_issuer;
mod transfer_service;

pub use expiry_policy::ExpiryPolicy;
pub use token_issuer::TokenIssuer;
pub use transfer_service::{TransferOptions, TransferService, UploadRules};
