//! Credential exchange against the Identity Toolkit `accounts:signInWithIdp`
//! endpoint.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;

use crate::config::IdentityToolkitSettings;
use crate::models::{CredentialRef, IdentityAssertion, SessionPrincipal, SessionTokens};
use crate::services::credential_exchanger::CredentialExchanger;
use crate::services::error::ExchangeFailure;

const SIGN_IN_WITH_IDP_PATH: &str = "/v1/accounts:signInWithIdp";

/// Backend codes meaning the assertion itself was not acceptable.
const INVALID_ASSERTION_CODES: &[&str] = &[
    "INVALID_IDP_RESPONSE",
    "INVALID_ID_TOKEN",
    "MISSING_OR_INVALID_NONCE",
    "INVALID_CREDENTIAL_OR_PROVIDER_ID",
    "TOKEN_EXPIRED",
];

/// Response fields holding bearer credentials; masked before a body is kept.
const CREDENTIAL_FIELDS: &[&str] = &[
    "idToken",
    "refreshToken",
    "oauthIdToken",
    "oauthAccessToken",
    "oauthRefreshToken",
    "oauthTokenSecret",
    "pendingToken",
];

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: Option<String>,
    federated_id: Option<String>,
    provider_id: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    #[serde(default)]
    is_new_user: bool,
    #[serde(default)]
    need_confirmation: bool,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: BackendError,
}

#[derive(Debug, Deserialize)]
struct BackendError {
    message: String,
}

pub struct IdentityToolkitExchanger {
    api_key: Secret<String>,
    endpoint: String,
    request_uri: String,
    http_client: Client,
}

impl IdentityToolkitExchanger {
    pub fn new(settings: &IdentityToolkitSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            endpoint: format!(
                "{}{}",
                settings.base_url.trim_end_matches('/'),
                SIGN_IN_WITH_IDP_PATH
            ),
            request_uri: settings.request_uri.clone(),
            http_client: Client::new(),
        }
    }

    fn principal_from_response(
        response: SignInWithIdpResponse,
        body: &str,
        provider_id: String,
    ) -> Result<SessionPrincipal, ExchangeFailure> {
        if let Some(message) = response.error_message {
            return Err(ExchangeFailure::Rejected {
                code: backend_code(&message).to_string(),
                raw: redact_credentials(body),
            });
        }

        if response.need_confirmation {
            return Err(ExchangeFailure::Rejected {
                code: "NEED_CONFIRMATION".to_string(),
                raw: redact_credentials(body),
            });
        }

        let Some(local_id) = response.local_id.filter(|id| !id.is_empty()) else {
            return Err(ExchangeFailure::Rejected {
                code: "MALFORMED_RESPONSE".to_string(),
                raw: redact_credentials(body),
            });
        };

        let tokens = match (response.id_token, response.refresh_token) {
            (Some(id_token), Some(refresh_token)) => Some(SessionTokens {
                id_token: Secret::new(id_token),
                refresh_token: Secret::new(refresh_token),
                expires_in: response.expires_in.and_then(|s| s.parse().ok()),
            }),
            _ => None,
        };

        Ok(SessionPrincipal {
            id: local_id,
            credential: CredentialRef {
                provider_id: response.provider_id.unwrap_or(provider_id),
                federated_id: response.federated_id,
            },
            email: response.email,
            display_name: response.display_name,
            is_new_user: response.is_new_user,
            tokens,
        })
    }
}

#[async_trait]
impl CredentialExchanger for IdentityToolkitExchanger {
    #[tracing::instrument(skip_all, fields(provider_id = %assertion.provider_id()))]
    async fn exchange(
        &self,
        assertion: IdentityAssertion,
    ) -> Result<SessionPrincipal, ExchangeFailure> {
        let provider_id = assertion.provider_id().to_string();
        let token = assertion.into_token();

        let post_body = serde_urlencoded::to_string([
            ("id_token", token.expose_secret().as_str()),
            ("providerId", provider_id.as_str()),
        ])
        .map_err(|e| ExchangeFailure::InvalidAssertion(format!("unencodable assertion: {}", e)))?;

        let request = SignInWithIdpRequest {
            post_body,
            request_uri: &self.request_uri,
            return_idp_credential: true,
            return_secure_token: true,
        };

        let response = self
            .http_client
            .traced_post(&self.endpoint)
            .query(&[("key", self.api_key.expose_secret().as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Credential exchange request failed");
                ExchangeFailure::Unreachable(format!("request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeFailure::Unreachable(format!("response unreadable: {}", e)))?;

        if !status.is_success() {
            let raw = redact_credentials(&body);
            let failure = classify_error(status, &raw);
            tracing::warn!(status = %status, raw = %raw, "Credential exchange failed");
            return Err(failure);
        }

        let parsed: SignInWithIdpResponse = serde_json::from_str(&body).map_err(|e| {
            let raw = redact_credentials(&body);
            tracing::warn!(error = %e, raw = %raw, "Unparseable exchange response");
            ExchangeFailure::Rejected {
                code: "MALFORMED_RESPONSE".to_string(),
                raw,
            }
        })?;

        Self::principal_from_response(parsed, &body, provider_id)
    }
}

/// Backend messages look like `CODE : human readable detail`.
fn backend_code(message: &str) -> &str {
    message.split(" : ").next().unwrap_or(message).trim()
}

/// Mask credential values in a JSON response body, keeping everything else.
///
/// Bodies that are not a JSON object are returned unchanged.
fn redact_credentials(body: &str) -> String {
    let Ok(serde_json::Value::Object(mut fields)) = serde_json::from_str(body) else {
        return body.to_string();
    };

    let mut redacted = false;
    for field in CREDENTIAL_FIELDS {
        if let Some(value) = fields.get_mut(*field) {
            *value = serde_json::Value::String(REDACTED.to_string());
            redacted = true;
        }
    }

    if !redacted {
        return body.to_string();
    }
    serde_json::Value::Object(fields).to_string()
}

/// Map a non-2xx backend response to an exchange failure.
fn classify_error(status: StatusCode, body: &str) -> ExchangeFailure {
    if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) {
        return ExchangeFailure::Unreachable(format!("backend returned {}", status));
    }

    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return ExchangeFailure::Rejected {
            code: format!("HTTP_{}", status.as_u16()),
            raw: body.to_string(),
        };
    };

    let code = backend_code(&envelope.error.message);
    if INVALID_ASSERTION_CODES.contains(&code) {
        ExchangeFailure::InvalidAssertion(envelope.error.message.clone())
    } else {
        ExchangeFailure::Rejected {
            code: code.to_string(),
            raw: body.to_string(),
        }
    }
}
