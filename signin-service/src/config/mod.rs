use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub google: GoogleSettings,
    pub identity_toolkit: IdentityToolkitSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP collector endpoint; spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct GoogleSettings {
    /// OAuth client ID registered for this application.
    pub client_id: String,
    pub client_secret: Secret<String>,
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

#[derive(Deserialize, Clone)]
pub struct IdentityToolkitSettings {
    /// Web API key of the backend project.
    pub api_key: Secret<String>,
    #[serde(default = "default_identity_toolkit_url")]
    pub base_url: String,
    /// Continue URI the backend records for the IdP sign-in.
    #[serde(default = "default_request_uri")]
    pub request_uri: String,
}

fn default_service_name() -> String {
    "signin-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_discovery_url() -> String {
    "https://accounts.google.com/.well-known/openid-configuration".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "email".to_string(), "profile".to_string()]
}

fn default_identity_toolkit_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_request_uri() -> String {
    "http://localhost".to_string()
}

impl Settings {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.google.client_id.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "google.client_id must not be empty"
            )));
        }

        if self.identity_toolkit.api_key.expose_secret().trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "identity_toolkit.api_key must not be empty"
            )));
        }

        if !self.google.scopes.iter().any(|s| s == "openid") {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "google.scopes must include 'openid' to receive an ID token"
            )));
        }

        Ok(())
    }
}

/// Load settings from `signin-service/config` plus `APP_` environment overrides.
pub fn get_configuration() -> Result<Settings, AppError> {
    let directory = core_config::configuration_directory("signin-service")?;
    let settings: Settings = core_config::load_settings(&directory)?;
    settings.validate()?;
    Ok(settings)
}
