use thiserror::Error;

/// Startup and infrastructure failures shared by workspace binaries.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Telemetry error: {0}")]
    TelemetryError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<tracing_subscriber::util::TryInitError> for AppError {
    fn from(err: tracing_subscriber::util::TryInitError) -> Self {
        AppError::TelemetryError(err.to_string())
    }
}
