//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::time::Duration;

use folio_core::{ReaderSettings, SessionSettings};
use tracing::Level;
use url::Url;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: Url,
    pub google_client_id: Option<String>,
    pub state_database_url: String,
    pub log_level: Level,
    pub request_timeout: Duration,
    pub upgrade_delay: Duration,
    pub idle_chrome_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Remote Services ---
        let api_url_str = lookup("API_URL").unwrap_or_else(|| "http://localhost:3001/api".to_string());
        let api_url = Url::parse(&api_url_str)
            .map_err(|e| ConfigError::InvalidValue("API_URL".to_string(), e.to_string()))?;

        // The federated provider only exists when a client id is configured.
        let google_client_id = lookup("GOOGLE_CLIENT_ID").filter(|id| !id.trim().is_empty());

        // --- Local State ---
        let state_database_url = lookup("STATE_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://folio-state.db?mode=rwc".to_string());
        if !state_database_url.starts_with("sqlite:") {
            return Err(ConfigError::InvalidValue(
                "STATE_DATABASE_URL".to_string(),
                format!("'{}' is not a sqlite URL", state_database_url),
            ));
        }

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Timings ---
        let request_timeout = millis(&lookup, "REQUEST_TIMEOUT_MS", 10_000)?;
        let upgrade_delay = millis(&lookup, "UPGRADE_DELAY_MS", 2_000)?;
        let idle_chrome_timeout = millis(&lookup, "IDLE_CHROME_MS", 3_000)?;

        Ok(Self {
            api_url,
            google_client_id,
            state_database_url,
            log_level,
            request_timeout,
            upgrade_delay,
            idle_chrome_timeout,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            federated_provider: self.google_client_id.is_some(),
            upgrade_delay: self.upgrade_delay,
        }
    }

    pub fn reader_settings(&self) -> ReaderSettings {
        ReaderSettings {
            idle_timeout: self.idle_chrome_timeout,
        }
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match lookup(key) {
        None => Ok(Duration::from_millis(default)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
