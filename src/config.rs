//! Feed configuration
//!
//! Configuration is layered: built-in defaults, then an optional YAML file, then
//! environment variables. Call [`FeedConfig::validate`] after the last layer.
//!
//! ```yaml
//! url: ws://camera-host:8006/websocket/connect
//! max_reconnect_attempts: 10
//! ```

use crate::connection::Backoff;
use crate::{FeedError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_URL: &str = "ws://localhost:8006/websocket/connect";
pub const DEFAULT_GREETING: &str = "Hello from the camfeed client";

/// Environment variable overriding [`FeedConfig::url`].
pub const ENV_URL: &str = "CAMFEED_URL";
/// Environment variable overriding [`FeedConfig::max_reconnect_attempts`].
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "CAMFEED_MAX_RECONNECT_ATTEMPTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Backend WebSocket endpoint
    pub url: String,

    /// Text message sent once after every successful open
    pub greeting: String,

    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,

    /// Consecutive failed attempts before giving up
    pub max_reconnect_attempts: u32,

    /// Arrivals kept for the rolling framerate
    pub framerate_window: usize,

    /// Buffered server text messages per subscriber
    pub server_message_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 30_000,
            max_reconnect_attempts: 30,
            framerate_window: 60,
            server_message_capacity: 256,
        }
    }
}

impl FeedConfig {
    /// Defaults with a different endpoint
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            FeedError::config_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    /// Apply `CAMFEED_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_URL).filter(|value| !value.trim().is_empty()) {
            self.url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_RECONNECT_ATTEMPTS) {
            self.max_reconnect_attempts = raw.trim().parse().map_err(|_| {
                FeedError::config_error(format!(
                    "{ENV_MAX_RECONNECT_ATTEMPTS} must be a positive integer, got '{raw}'"
                ))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(FeedError::config_error(format!(
                "url must start with ws:// or wss://, got '{}'",
                self.url
            )));
        }
        if self.reconnect_base_delay_ms == 0 {
            return Err(FeedError::config_error("reconnect_base_delay_ms must be positive"));
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(FeedError::config_error(format!(
                "reconnect_base_delay_ms ({}) exceeds reconnect_max_delay_ms ({})",
                self.reconnect_base_delay_ms, self.reconnect_max_delay_ms
            )));
        }
        if self.max_reconnect_attempts == 0 {
            return Err(FeedError::config_error("max_reconnect_attempts must be at least 1"));
        }
        if self.framerate_window < 2 {
            return Err(FeedError::config_error("framerate_window must be at least 2"));
        }
        if self.server_message_capacity == 0 {
            return Err(FeedError::config_error("server_message_capacity must be positive"));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_base_delay_ms),
            Duration::from_millis(self.reconnect_max_delay_ms),
        )
    }
}
