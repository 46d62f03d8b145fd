//! # Peerlink
//!
//! Real-time multiplayer client sync core.
//!
//! Peerlink keeps a game client in step with an authoritative server over
//! one WebSocket: the local player's state goes out at most once per tick,
//! and remote players come back as create/move/destroy calls on a
//! [`PeerPresenter`] you implement.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peerlink::prelude::*;
//!
//! struct Log;
//!
//! impl PeerPresenter for Log {
//!     type Handle = ();
//!     fn create_peer(&mut self, id: &PeerId, at: Position2D) {
//!         println!("{id} joined at {},{}", at.x, at.y);
//!     }
//!     fn move_peer(&mut self, _: &mut (), _: &PeerId, _: Position2D) {}
//!     fn destroy_peer(&mut self, _: (), id: &PeerId) {
//!         println!("{id} left");
//!     }
//! }
//!
//! # async fn example() -> Result<(), PeerlinkError> {
//! let client = PeerlinkClient::builder()
//!     .endpoint("ws://localhost:8090/ws")
//!     .build()?;
//! let reason = client
//!     .run(Log, |session, tick| {
//!         session.set_position(tick.tick as f32, 0.0);
//!     })
//!     .await?;
//! println!("disconnected: {reason}");
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod session;

pub use client::{PeerlinkClient, PeerlinkClientBuilder};
pub use config::{ClientConfig, DEFAULT_ENDPOINT};
pub use error::{ConfigError, PeerlinkError};
pub use session::{ClientSession, Connected};

/// Installs a `tracing` subscriber that writes to stderr.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies (for
/// example `"info"` or `"peerlink=debug"`). Does nothing if a subscriber
/// is already installed.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Re-exports for the common case.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientSession, Connected, PeerlinkClient, PeerlinkError, init_tracing,
    };
    pub use peerlink_peers::{PeerPresenter, PeerReconciler, Reconciled};
    pub use peerlink_protocol::{PeerId, PeerIdWire, PlayerControlState, Position2D};
    pub use peerlink_sync::SnapshotApplied;
    pub use peerlink_tick::TickInfo;
    pub use peerlink_transport::{CloseReason, ConnectionState};
}
