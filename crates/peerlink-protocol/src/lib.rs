//! Wire protocol for Peerlink.
//!
//! This crate defines what the client and the game server say to each
//! other:
//!
//! - **Types** ([`WireMessage`], [`PeerId`], [`Position2D`],
//!   [`PlayerControlState`]) — the values carried in a frame.
//! - **Codec** ([`Codec`] trait, [`BinaryCodec`]) — how those values are
//!   laid out as bytes.
//! - **Errors** ([`ProtocolError`]) — what can be wrong with a frame.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or peers. One frame in,
//! one message out.
//!
//! ```text
//! Transport (frames) → Protocol (WireMessage) → Sync (typed events)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{BinaryCodec, Codec, PeerIdWire};
pub use error::ProtocolError;
pub use types::{
    MessageKind, PeerId, PeerPosition, PlayerControlState, Position2D, WireMessage,
};
