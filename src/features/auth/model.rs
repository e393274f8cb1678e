use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Caller identity established by the identity provider.
///
/// `owner_id` is the stable id file records are owned by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    pub owner_id: String,
    pub subject: String,
    /// Session UID (only present for interactive OIDC flows, not for token exchange)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_uid: Option<String>,
}

impl Principal {
    #[cfg(test)]
    pub fn new(owner_id: impl Into<String>) -> Self {
        let owner_id = owner_id.into();
        Self {
            subject: owner_id.clone(),
            owner_id,
            session_uid: None,
        }
    }
}

/// Principal if the request carried valid credentials, `None` otherwise
#[derive(Debug, Clone, Default)]
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
    pub fn owner_id(&self) -> Option<&str> {
        self.0.as_ref().map(|p| p.owner_id.as_str())
    }
}
