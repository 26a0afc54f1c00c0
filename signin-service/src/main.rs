use service_core::error::AppError;
use service_core::observability::logging::init_tracing;
use signin_service::{
    build_sign_in_flow,
    config::get_configuration,
    services::{metrics, VerificationPrompt, VerificationRequest},
};
use std::sync::Arc;

/// Shows the device verification step on the terminal.
struct TerminalPrompt;

impl VerificationPrompt for TerminalPrompt {
    fn present(&self, request: &VerificationRequest) {
        eprintln!(
            "To sign in, visit {} and enter the code {} (expires in {}s)",
            request.verification_uri, request.user_code, request.expires_in
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let settings = get_configuration()?;

    init_tracing(
        &settings.application.service_name,
        &settings.application.log_level,
        settings.application.otlp_endpoint.as_deref(),
    )?;

    metrics::init_metrics()
        .map_err(|e| AppError::TelemetryError(format!("Failed to initialize metrics: {}", e)))?;

    tracing::info!(
        service = %settings.application.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting sign-in"
    );

    let flow = build_sign_in_flow(&settings, Arc::new(TerminalPrompt));

    match flow.sign_in().await {
        Ok(principal) => {
            println!("{}", principal.id);
            Ok(())
        }
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), "Sign-in did not complete");
            Err(e.into())
        }
    }
}
