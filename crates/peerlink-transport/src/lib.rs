//! Transport abstraction and connection lifecycle for Peerlink.
//!
//! Provides the [`Transport`] trait that abstracts over the socket, the
//! [`Connection`] state machine that owns one transport, and the events
//! that flow between them.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket client transport via `tokio-tungstenite`

mod connection;
mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use connection::{Connection, ConnectionEvent, ConnectionState};
pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{TransportEvents, WebSocketTransport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The local side called [`Connection::close`].
    Local,
    /// The server closed the socket. `code` is the WebSocket close code
    /// when one was sent.
    Remote { code: Option<u16>, reason: String },
    /// The socket failed (connect refused, reset, protocol violation).
    Error(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("closed locally"),
            Self::Remote {
                code: Some(code),
                reason,
            } => write!(f, "closed by server ({code}): {reason}"),
            Self::Remote { code: None, .. } => f.write_str("closed by server"),
            Self::Error(e) => write!(f, "transport error: {e}"),
        }
    }
}

/// Notifications a transport delivers about its socket.
///
/// A transport reports `Opened` at most once, then any number of frames,
/// then `Closed`. [`Connection::handle`] tolerates violations of that
/// order, so a misbehaving transport can't break the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    /// One complete inbound message. Framing is native to the transport,
    /// so no reassembly is ever needed.
    Frame(Vec<u8>),
    Closed(CloseReason),
}

/// The outbound half of a socket.
///
/// Both methods are fire-and-forget. They must never block the caller,
/// which runs inside the synchronization tick.
pub trait Transport: 'static {
    /// The error type for send failures.
    type Error: std::error::Error + Send + Sync;

    /// Queues one frame for delivery.
    fn send(&mut self, frame: Vec<u8>) -> Result<(), Self::Error>;

    /// Starts closing the socket. Calling it more than once is harmless.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::Local.to_string(), "closed locally");
        let remote = CloseReason::Remote {
            code: Some(1000),
            reason: "bye".into(),
        };
        assert_eq!(remote.to_string(), "closed by server (1000): bye");
        assert!(CloseReason::Error("reset".into()).to_string().contains("reset"));
    }
}
