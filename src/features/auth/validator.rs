use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::jwks::JwksClient;
use super::model::Principal;
use super::IdentityProvider;
use crate::core::error::AppError;

/// Validates RS256 access tokens issued by the configured OIDC issuer
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    audience: String,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    // Issuer-specific claims, absent for token exchange tokens
    #[serde(default)]
    kind: Option<String>,
    #[serde(rename = "accountId", default)]
    account_id: Option<String>,
    #[serde(rename = "sessionUid", default)]
    session_uid: Option<String>,
}

impl JwtValidator {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        leeway: Duration,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            leeway: leeway.as_secs(),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation
    }
}

fn unauthorized(reason: impl std::fmt::Display) -> AppError {
    debug!("Rejected bearer token: {}", reason);
    AppError::Unauthorized("Invalid or expired access token".to_string())
}

fn principal_from(claims: Claims) -> Result<Principal, AppError> {
    if let Some(kind) = &claims.kind {
        if kind != "AccessToken" {
            return Err(unauthorized(format!("token kind '{}'", kind)));
        }
    }
    if claims.sub.is_empty() {
        return Err(unauthorized("empty subject"));
    }

    // Token exchange tokens carry no accountId; the subject is the owner then
    let owner_id = claims.account_id.unwrap_or_else(|| claims.sub.clone());

    Ok(Principal {
        owner_id,
        subject: claims.sub,
        session_uid: claims.session_uid,
    })
}

#[async_trait]
impl IdentityProvider for JwtValidator {
    async fn authenticate(&self, bearer_token: &str) -> Result<Principal, AppError> {
        let header = decode_header(bearer_token).map_err(unauthorized)?;

        if header.alg != Algorithm::RS256 {
            return Err(unauthorized(format!("algorithm {:?}", header.alg)));
        }

        let kid = header.kid.ok_or_else(|| unauthorized("missing kid"))?;

        let decoding_key = self.jwks_client.get_key(&kid).await.map_err(unauthorized)?;

        let token_data = decode::<Claims>(bearer_token, &decoding_key, &self.validation())
            .map_err(unauthorized)?;

        principal_from(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(kind: Option<&str>, account_id: Option<&str>) -> Claims {
        Claims {
            sub: "sub-1".to_string(),
            kind: kind.map(str::to_string),
            account_id: account_id.map(str::to_string),
            session_uid: None,
        }
    }

    #[test]
    fn test_account_id_is_preferred_owner() {
        let principal = principal_from(claims(Some("AccessToken"), Some("acct-1"))).unwrap();
        assert_eq!(principal.owner_id, "acct-1");
        assert_eq!(principal.subject, "sub-1");
    }

    #[test]
    fn test_subject_is_owner_without_account_id() {
        let principal = principal_from(claims(None, None)).unwrap();
        assert_eq!(principal.owner_id, "sub-1");
    }

    #[test]
    fn test_non_access_tokens_are_rejected() {
        let err = principal_from(claims(Some("IdToken"), None)).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let validator = JwtValidator::new(
            Arc::new(JwksClient::new("http://127.0.0.1:9/jwks", Duration::from_secs(60))),
            "https://issuer.test".to_string(),
            "datashare".to_string(),
            Duration::from_secs(60),
        );
        let err = validator.authenticate("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
