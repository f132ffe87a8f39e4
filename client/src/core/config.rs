//! # Client Configuration
//!
//! Timing constants and endpoint locations, loaded from environment variables with
//! defaults matching product behavior. Configuration is validated once at startup so a
//! misconfigured build fails fast instead of misbehaving at the first timeout.
//!
//! ```rust
//! use client::core::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::default();
//! assert_eq!(config.inactivity_timeout, Duration::from_secs(45 * 60));
//! assert!(config.validate().is_ok());
//! ```

use std::env;
use std::path::Path;
use std::time::Duration;

use super::error::{AppError, Result};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the backend-as-a-service REST gateway
    pub api_base_url: String,

    /// WebSocket endpoint of the realtime service
    pub realtime_url: String,

    /// Public (anonymous) API key sent with every request
    pub api_anon_key: Option<String>,

    /// How long succeeded/failed/warned phases stay visible
    pub feedback_display: Duration,

    /// Backoff added per consecutive failure
    pub backoff_step: Duration,

    /// Upper bound for the retry backoff
    pub backoff_cap: Duration,

    /// Idle time after which the session is force-closed
    pub inactivity_timeout: Duration,

    /// Minimum synthetic delay before committing a heavy screen
    pub heavy_transition_delay: Duration,

    /// Per-request HTTP timeout
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:54321".to_string(),
            realtime_url: "ws://127.0.0.1:54321/realtime/v1/websocket".to_string(),
            api_anon_key: None,
            feedback_display: Duration::from_secs(3),
            backoff_step: Duration::from_millis(1000),
            backoff_cap: Duration::from_millis(5000),
            inactivity_timeout: Duration::from_secs(45 * 60),
            heavy_transition_delay: Duration::from_millis(150),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; malformed numbers are reported.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api_base_url = env::var("API_BASE_URL").unwrap_or(defaults.api_base_url);
        let realtime_url = env::var("REALTIME_URL").unwrap_or_else(|_| {
            api_base_url
                .replace("http://", "ws://")
                .replace("https://", "wss://")
                + "/realtime/v1/websocket"
        });

        Ok(Self {
            api_base_url,
            realtime_url,
            api_anon_key: env::var("API_ANON_KEY").ok(),
            feedback_display: duration_var("CLIENT_FEEDBACK_DISPLAY_MS", Duration::from_millis)?
                .unwrap_or(defaults.feedback_display),
            backoff_step: duration_var("CLIENT_BACKOFF_STEP_MS", Duration::from_millis)?
                .unwrap_or(defaults.backoff_step),
            backoff_cap: duration_var("CLIENT_BACKOFF_CAP_MS", Duration::from_millis)?
                .unwrap_or(defaults.backoff_cap),
            inactivity_timeout: duration_var("CLIENT_INACTIVITY_SECS", Duration::from_secs)?
                .unwrap_or(defaults.inactivity_timeout),
            heavy_transition_delay: duration_var("CLIENT_HEAVY_TRANSITION_MS", Duration::from_millis)?
                .unwrap_or(defaults.heavy_transition_delay),
            http_timeout: duration_var("CLIENT_HTTP_TIMEOUT_SECS", Duration::from_secs)?
                .unwrap_or(defaults.http_timeout),
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "API_BASE_URL must be an http(s) URL, got {}",
                self.api_base_url
            )));
        }

        if !(self.realtime_url.starts_with("ws://") || self.realtime_url.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "REALTIME_URL must be a ws(s) URL, got {}",
                self.realtime_url
            )));
        }

        let durations = [
            ("feedback display", self.feedback_display),
            ("backoff step", self.backoff_step),
            ("inactivity timeout", self.inactivity_timeout),
            ("http timeout", self.http_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(AppError::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.backoff_cap < self.backoff_step {
            return Err(AppError::Config(
                "backoff cap must not be smaller than the backoff step".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load `KEY=value` pairs from a dotenv file into the process environment.
///
/// Variables already set in the environment keep their value. Returns whether the file
/// was found; a missing file is not an error, a malformed one is.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(err) if err.not_found() => Ok(false),
        Err(err) => Err(AppError::Config(format!(
            "Invalid env file {}: {}",
            path.display(),
            err
        ))),
    }
}

fn duration_var(name: &str, unit: fn(u64) -> Duration) -> Result<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|value| Some(unit(value)))
            .map_err(|e| AppError::Config(format!("{} must be a valid number: {}", name, e))),
        Err(_) => Ok(None),
    }
}
