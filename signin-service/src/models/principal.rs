use secrecy::Secret;
use serde::Serialize;

/// Link between a backend principal and the provider account that proved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialRef {
    pub provider_id: String,
    pub federated_id: Option<String>,
}

/// Backend session tokens issued alongside a principal.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub id_token: Secret<String>,
    pub refresh_token: Secret<String>,
    pub expires_in: Option<u64>,
}

/// The authenticated identity as recognized by the backend.
#[derive(Debug, Clone)]
pub struct SessionPrincipal {
    pub id: String,
    pub credential: CredentialRef,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub is_new_user: bool,
    pub tokens: Option<SessionTokens>,
}

impl SessionPrincipal {
    pub fn new(id: impl Into<String>, credential: CredentialRef) -> Self {
        Self {
            id: id.into(),
            credential,
            email: None,
            display_name: None,
            is_new_user: false,
            tokens: None,
        }
    }
}
