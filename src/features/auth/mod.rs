//! Bearer-token authentication against an OIDC issuer

mod jwks;
mod validator;

pub mod model;

use async_trait::async_trait;

use crate::core::error::AppError;

pub use jwks::JwksClient;
pub use model::{MaybePrincipal, Principal};
pub use validator::JwtValidator;

/// Turns a bearer token into a principal
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, bearer_token: &str) -> Result<Principal, AppError>;
}
