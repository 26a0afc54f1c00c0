//! Google sign-in through the OAuth 2.0 device authorization grant.
//!
//! Endpoints are resolved from the OpenID discovery document on every call,
//! so the provider keeps no state between attempts. Once the availability
//! check has passed, a discovery failure during the prompt is a provider
//! error rather than unavailability.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::GoogleSettings;
use crate::models::{IdentityAssertion, GOOGLE_PROVIDER_ID};
use crate::services::error::ProviderFailure;
use crate::services::identity_provider::{
    IdentityProviderClient, VerificationPrompt, VerificationRequest,
};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    device_authorization_endpoint: Option<String>,
    token_endpoint: Option<String>,
}

#[derive(Debug)]
struct Endpoints {
    device_authorization: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    // Google still returns the pre-RFC field name.
    #[serde(alias = "verification_url")]
    verification_uri: String,
    expires_in: u64,
    interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

pub struct GoogleDeviceProvider {
    client_id: String,
    client_secret: Secret<String>,
    discovery_url: String,
    scopes: Vec<String>,
    http_client: Client,
    prompt: Arc<dyn VerificationPrompt>,
}

impl GoogleDeviceProvider {
    pub fn new(settings: &GoogleSettings, prompt: Arc<dyn VerificationPrompt>) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            discovery_url: settings.discovery_url.clone(),
            scopes: settings.scopes.clone(),
            http_client: Client::new(),
            prompt,
        }
    }

    async fn discover(&self) -> Result<Endpoints, ProviderFailure> {
        let response = self
            .http_client
            .traced_get(&self.discovery_url)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.discovery_url, error = %e, "Discovery request failed");
                ProviderFailure::Unavailable(format!("discovery request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderFailure::Unavailable(format!(
                "discovery document returned {}",
                status
            )));
        }

        let document: DiscoveryDocument = response.json().await.map_err(|e| {
            ProviderFailure::Unavailable(format!("invalid discovery document: {}", e))
        })?;

        match (document.device_authorization_endpoint, document.token_endpoint) {
            (Some(device_authorization), Some(token)) => Ok(Endpoints {
                device_authorization,
                token,
            }),
            _ => Err(ProviderFailure::Unavailable(
                "provider does not support the device authorization grant".to_string(),
            )),
        }
    }

    async fn request_device_code(&self, endpoint: &str) -> Result<DeviceCodeResponse, ProviderFailure> {
        let scope = self.scopes.join(" ");
        let params = [("client_id", self.client_id.as_str()), ("scope", scope.as_str())];

        let response = self
            .http_client
            .traced_post(endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderFailure::Failed(format!("device code request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
            tracing::warn!(status = %status, body = %body, "Device code request rejected");
            return Err(ProviderFailure::Failed(format!(
                "device code request returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderFailure::Failed(format!("invalid device code response: {}", e)))
    }

    async fn poll_for_id_token(
        &self,
        endpoint: &str,
        device: &DeviceCodeResponse,
        deadline: Instant,
    ) -> Result<String, ProviderFailure> {
        let mut interval =
            Duration::from_secs(device.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS));

        loop {
            // Never sleep past the deadline, whatever interval the provider asks for.
            let wake = Instant::now()
                .checked_add(interval)
                .map_or(deadline, |at| at.min(deadline));
            tokio::time::sleep_until(wake).await;
            if Instant::now() >= deadline {
                return Err(ProviderFailure::Failed(
                    "device code expired before approval".to_string(),
                ));
            }

            let params = [
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret().as_str()),
                ("device_code", device.device_code.as_str()),
                ("grant_type", DEVICE_CODE_GRANT),
            ];

            let response = self
                .http_client
                .traced_post(endpoint)
                .form(&params)
                .send()
                .await
                .map_err(|e| ProviderFailure::Failed(format!("token request failed: {}", e)))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| ProviderFailure::Failed(format!("token response unreadable: {}", e)))?;

            if status.is_success() {
                let tokens: TokenResponse = serde_json::from_str(&body).map_err(|e| {
                    ProviderFailure::Failed(format!("invalid token response: {}", e))
                })?;
                return tokens
                    .id_token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        ProviderFailure::Failed("token response did not include an id_token".to_string())
                    });
            }

            let error: TokenErrorResponse = serde_json::from_str(&body).map_err(|_| {
                ProviderFailure::Failed(format!("token endpoint returned {}", status))
            })?;

            match error.error.as_str() {
                "authorization_pending" => {}
                "slow_down" => {
                    interval =
                        interval.saturating_add(Duration::from_secs(SLOW_DOWN_INCREMENT_SECS));
                    tracing::debug!(interval_secs = interval.as_secs(), "Provider asked to slow down");
                }
                "access_denied" => return Err(ProviderFailure::Cancelled),
                "expired_token" => {
                    return Err(ProviderFailure::Failed("device code expired".to_string()))
                }
                other => {
                    return Err(ProviderFailure::Failed(format!(
                        "{}: {}",
                        other,
                        error.error_description.unwrap_or_default()
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl IdentityProviderClient for GoogleDeviceProvider {
    fn provider_id(&self) -> &str {
        GOOGLE_PROVIDER_ID
    }

    #[tracing::instrument(skip(self))]
    async fn check_availability(&self) -> Result<(), ProviderFailure> {
        self.discover().await.map(|_| ())
    }

    #[tracing::instrument(skip(self))]
    async fn obtain_assertion(&self) -> Result<IdentityAssertion, ProviderFailure> {
        let endpoints = self.discover().await.map_err(|e| match e {
            ProviderFailure::Unavailable(detail) => ProviderFailure::Failed(detail),
            other => other,
        })?;
        let device = self
            .request_device_code(&endpoints.device_authorization)
            .await?;

        let deadline = Instant::now()
            .checked_add(Duration::from_secs(device.expires_in))
            .ok_or_else(|| {
                ProviderFailure::Failed(format!("invalid expires_in: {}", device.expires_in))
            })?;

        self.prompt.present(&VerificationRequest {
            verification_uri: device.verification_uri.clone(),
            user_code: device.user_code.clone(),
            expires_in: device.expires_in,
        });

        let id_token = self
            .poll_for_id_token(&endpoints.token, &device, deadline)
            .await?;
        tracing::info!("Identity provider issued an assertion");

        Ok(IdentityAssertion::new(id_token, GOOGLE_PROVIDER_ID))
    }
}
