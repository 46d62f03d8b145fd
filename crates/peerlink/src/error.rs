//! Unified error type for the Peerlink client.

use peerlink_transport::TransportError;

/// Errors from loading or validating a [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file couldn't be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config wasn't valid JSON or had fields of the wrong type.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The config parsed but a value is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PeerlinkError {
    /// A transport-level error (connect, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
