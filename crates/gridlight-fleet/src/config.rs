//! Session configuration.
//!
//! Loaded from an optional TOML file plus `GRIDLIGHT_*` environment
//! overrides (nested fields use `__`, e.g. `GRIDLIGHT_RECONNECT__MAX_ATTEMPTS`).
//! Durations accept humantime strings (`"10s"`, `"500ms"`).

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use gridlight_core::{GridlightError, Result};

use crate::channel::{ChannelConfig, DEFAULT_HANDSHAKE_TIMEOUT};
use crate::reconnect::ReconnectConfig;

/// Default control-plane base URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
/// Default telemetry WebSocket base URL.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8000/ws";

/// Top-level configuration for one dashboard session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Control-plane REST base URL (`http` or `https`).
    pub api_url: String,
    /// Telemetry WebSocket base URL (`ws` or `wss`).
    pub ws_url: String,
    /// Bound on each channel handshake attempt.
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Duration,
    /// Per-channel reconnect policy.
    pub reconnect: ReconnectConfig,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl FleetConfig {
    /// Load configuration from `path` (or `./gridlight.toml` when present)
    /// merged with `GRIDLIGHT_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`GridlightError::Configuration`] on unreadable files, type
    /// mismatches, or values that fail [`FleetConfig::validate`].
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("gridlight").required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix("GRIDLIGHT").separator("__"))
            .build()
            .map_err(|e| GridlightError::Configuration(e.to_string()))?;

        let config: FleetConfig = settings
            .try_deserialize()
            .map_err(|e| GridlightError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation beyond what parsing catches.
    ///
    /// # Errors
    ///
    /// [`GridlightError::Configuration`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let api = Url::parse(&self.api_url)
            .map_err(|e| GridlightError::Configuration(format!("api_url: {e}")))?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(GridlightError::Configuration(format!(
                "api_url: unsupported scheme {:?}",
                api.scheme()
            )));
        }

        let ws = Url::parse(&self.ws_url)
            .map_err(|e| GridlightError::Configuration(format!("ws_url: {e}")))?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(GridlightError::Configuration(format!(
                "ws_url: unsupported scheme {:?}",
                ws.scheme()
            )));
        }

        if self.handshake_timeout.is_zero() {
            return Err(GridlightError::Configuration(
                "handshake_timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Per-channel view of this configuration.
    #[must_use]
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            handshake_timeout: self.handshake_timeout,
            reconnect: self.reconnect.clone(),
        }
    }
}
