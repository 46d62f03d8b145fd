//! State synchronization for Peerlink clients.
//!
//! Two halves, one per direction:
//!
//! - [`OutboundTracker`] — holds the local player's state and coalesces
//!   any number of changes into at most one `PlayerMoved` per tick.
//! - [`InboundDispatcher`] — decodes server frames and republishes them on
//!   typed [`EventChannel`]s.
//!
//! # How it fits in the stack
//!
//! ```text
//! input / movement ──→ OutboundTracker ──→ Connection ──→ server
//! server ──→ Connection ──→ InboundDispatcher ──→ peer reconciliation
//! ```
//!
//! Everything here is single-threaded: both halves are driven from the
//! client's one cooperative loop and never block.

mod dispatch;
mod events;
mod outbound;

pub use dispatch::{DispatchStats, InboundDispatcher};
pub use events::{
    EventChannel, PeerEvent, PeerJoined, PeerLeft, PeerPositionUpdated, SnapshotApplied,
    SubscriptionId,
};
pub use outbound::{LocalOutboundState, OutboundTracker, TrackerStats};
