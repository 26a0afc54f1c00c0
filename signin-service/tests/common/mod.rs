//! Shared helpers for signin-service integration tests.

#![allow(dead_code)]

use secrecy::Secret;
use serde_json::json;
use signin_service::config::{GoogleSettings, IdentityToolkitSettings};
use signin_service::services::{VerificationPrompt, VerificationRequest};
use std::io;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_CLIENT_ID: &str = "test-client.apps.googleusercontent.com";
pub const TEST_CLIENT_SECRET: &str = "test-client-secret";
pub const TEST_API_KEY: &str = "test-api-key";

/// Prompt that remembers every verification request it was shown.
#[derive(Default)]
pub struct RecordingPrompt {
    requests: Mutex<Vec<VerificationRequest>>,
}

impl RecordingPrompt {
    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl VerificationPrompt for RecordingPrompt {
    fn present(&self, request: &VerificationRequest) {
        self.requests.lock().unwrap().push(request.clone());
    }
}

pub fn google_settings(server: &MockServer) -> GoogleSettings {
    GoogleSettings {
        client_id: TEST_CLIENT_ID.to_string(),
        client_secret: Secret::new(TEST_CLIENT_SECRET.to_string()),
        discovery_url: format!("{}/.well-known/openid-configuration", server.uri()),
        scopes: vec!["openid".to_string(), "email".to_string()],
    }
}

pub fn toolkit_settings(base_url: &str) -> IdentityToolkitSettings {
    IdentityToolkitSettings {
        api_key: Secret::new(TEST_API_KEY.to_string()),
        base_url: base_url.to_string(),
        request_uri: "http://localhost".to_string(),
    }
}

/// Serve a discovery document advertising the device grant on `server`.
pub async fn mount_discovery(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": "https://accounts.google.com",
            "device_authorization_endpoint": format!("{}/device/code", server.uri()),
            "token_endpoint": format!("{}/token", server.uri()),
        })))
        .mount(server)
        .await;
}

/// Device code response with a zero poll interval so tests do not sleep.
pub async fn mount_device_code(server: &MockServer) {
    mount_device_code_with(server, 1800, 0).await;
}

pub async fn mount_device_code_with(server: &MockServer, expires_in: u64, interval: u64) {
    Mock::given(method("POST"))
        .and(path("/device/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-code-1",
            "user_code": "ABCD-EFGH",
            "verification_url": "https://www.google.com/device",
            "expires_in": expires_in,
            "interval": interval,
        })))
        .mount(server)
        .await;
}

pub fn token_error(error: &str) -> ResponseTemplate {
    ResponseTemplate::new(428).set_body_json(json!({
        "error": error,
        "error_description": format!("{} from test", error),
    }))
}

/// A local URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// In-memory sink for the JSON log lines emitted while a guard is held.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Route this thread's `tracing` output into the buffer until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
