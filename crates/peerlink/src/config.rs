//! Client configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! gives a working client against a local server:
//!
//! ```json
//! {
//!   "endpoint": "ws://localhost:8090/ws",
//!   "tick_rate_hz": 60,
//!   "peer_id_wire": "utf8",
//!   "tick_jitter_us": 2000
//! }
//! ```

use std::path::Path;

use peerlink_protocol::PeerIdWire;
use peerlink_tick::TickConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8090/ws";

/// Settings for one client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    pub endpoint: String,
    /// How often the outbound tracker is flushed.
    pub tick_rate_hz: u32,
    /// How the server encodes peer ids.
    pub peer_id_wire: PeerIdWire,
    /// Upper bound on the random delay before the first tick.
    pub tick_jitter_us: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            tick_rate_hz: 60,
            peer_id_wire: PeerIdWire::default(),
            tick_jitter_us: 2_000,
        }
    }
}

impl ClientConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), endpoint = %config.endpoint, "config loaded");
        Ok(config)
    }

    /// Checks that the values can actually drive a session.
    ///
    /// The tick rate is only rejected when zero. Out-of-range rates are
    /// clamped by the ticker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".into()));
        }
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be a ws:// or wss:// URL, got {:?}",
                self.endpoint
            )));
        }
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be > 0".into()));
        }
        Ok(())
    }

    /// The ticker settings this config implies.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            tick_rate_hz: self.tick_rate_hz,
            initial_jitter_us: self.tick_jitter_us,
        }
        .validated()
    }
}
