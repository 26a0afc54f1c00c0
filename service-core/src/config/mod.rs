use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable selecting the optional per-environment overlay file.
pub const ENVIRONMENT_VAR: &str = "APP_ENVIRONMENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }

    /// Reads `APP_ENVIRONMENT`, defaulting to `local`.
    pub fn current() -> Result<Self, AppError> {
        std::env::var(ENVIRONMENT_VAR)
            .unwrap_or_else(|_| "local".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

/// Resolve `<crate>/config` whether the process runs from the workspace root
/// or from inside the crate directory.
pub fn configuration_directory(crate_dir: &str) -> Result<PathBuf, AppError> {
    let base_path = std::env::current_dir().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "Failed to determine the current directory: {}",
            e
        ))
    })?;

    if base_path.ends_with(crate_dir) {
        Ok(base_path.join("config"))
    } else {
        Ok(base_path.join(crate_dir).join("config"))
    }
}

/// Layered settings loader.
///
/// Sources, lowest precedence first:
/// - `{dir}/base.yaml` (required)
/// - `{dir}/{environment}.yaml` (optional)
/// - `APP_`-prefixed environment variables, `__` separating nested keys
///   (e.g. `APP_GOOGLE__CLIENT_ID`)
pub fn load_settings<T: DeserializeOwned>(configuration_directory: &Path) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let environment = Environment::current()?;
    tracing::debug!(
        environment = environment.as_str(),
        directory = %configuration_directory.display(),
        "Loading settings"
    );

    let settings = Cfg::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            File::from(configuration_directory.join(format!("{}.yaml", environment.as_str())))
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}
