//! Inbound frame decoding and event dispatch.
//!
//! The dispatcher is the only place inbound bytes become typed events.
//! One frame is decoded, classified by its discriminant, and published on
//! the matching [`EventChannel`] before `on_frame` returns.
//!
//! ```text
//! frame ──decode──→ WireMessage ──classify──→ peer_joined
//!                                         ├─→ peer_left
//!                                         ├─→ peer_position_updated  (× N for a snapshot)
//!                                         └─→ snapshot_applied
//! ```

use peerlink_protocol::{BinaryCodec, Codec, WireMessage};

use crate::events::{
    EventChannel, PeerJoined, PeerLeft, PeerPositionUpdated, SnapshotApplied,
};

/// Counters for what the dispatcher has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub frames: u64,
    /// Events published across all channels.
    pub events: u64,
    /// Frames that failed to decode and were dropped.
    pub decode_failures: u64,
    /// Frames that decoded but carry nothing for the client: unknown
    /// kinds from a newer server, or client-only kinds echoed back.
    pub ignored: u64,
}

/// Decodes inbound frames and republishes them as typed events.
pub struct InboundDispatcher<C: Codec = BinaryCodec> {
    codec: C,
    peer_joined: EventChannel<PeerJoined>,
    peer_left: EventChannel<PeerLeft>,
    peer_position_updated: EventChannel<PeerPositionUpdated>,
    snapshot_applied: EventChannel<SnapshotApplied>,
    stats: DispatchStats,
}

impl InboundDispatcher<BinaryCodec> {
    pub fn new() -> Self {
        Self::with_codec(BinaryCodec::default())
    }
}

impl Default for InboundDispatcher<BinaryCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> InboundDispatcher<C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            peer_joined: EventChannel::new(),
            peer_left: EventChannel::new(),
            peer_position_updated: EventChannel::new(),
            snapshot_applied: EventChannel::new(),
            stats: DispatchStats::default(),
        }
    }

    pub fn peer_joined(&mut self) -> &mut EventChannel<PeerJoined> {
        &mut self.peer_joined
    }

    pub fn peer_left(&mut self) -> &mut EventChannel<PeerLeft> {
        &mut self.peer_left
    }

    pub fn peer_position_updated(&mut self) -> &mut EventChannel<PeerPositionUpdated> {
        &mut self.peer_position_updated
    }

    pub fn snapshot_applied(&mut self) -> &mut EventChannel<SnapshotApplied> {
        &mut self.snapshot_applied
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Decodes one frame and publishes its events.
    ///
    /// A frame that fails to decode is dropped with a warning. It never
    /// propagates: one bad frame must not take the client down. Returns
    /// the number of events published.
    pub fn on_frame(&mut self, frame: &[u8]) -> usize {
        self.stats.frames += 1;
        match self.codec.decode(frame) {
            Ok(Some(message)) => self.dispatch(message),
            Ok(None) => {
                self.stats.ignored += 1;
                tracing::debug!(
                    tag = frame.first().copied(),
                    len = frame.len(),
                    "ignoring frame with unknown message kind"
                );
                0
            }
            Err(e) => {
                self.stats.decode_failures += 1;
                tracing::warn!(error = %e, len = frame.len(), "dropping malformed frame");
                0
            }
        }
    }

    /// Publishes an already-decoded message. Returns the number of events
    /// published.
    pub fn dispatch(&mut self, message: WireMessage) -> usize {
        let published = match message {
            WireMessage::PeerJoined { peer_id, position } => {
                self.peer_joined.publish(&PeerJoined { peer_id, position });
                1
            }
            WireMessage::PeerLeft { peer_id } => {
                self.peer_left.publish(&PeerLeft { peer_id });
                1
            }
            WireMessage::PeerPositionUpdate { peer_id, position } => {
                self.peer_position_updated
                    .publish(&PeerPositionUpdated { peer_id, position });
                1
            }
            WireMessage::WorldSnapshot { peers } => {
                let peer_count = peers.len();
                for entry in peers {
                    self.peer_position_updated.publish(&PeerPositionUpdated {
                        peer_id: entry.peer_id,
                        position: entry.position,
                    });
                }
                self.snapshot_applied.publish(&SnapshotApplied { peer_count });
                tracing::trace!(peer_count, "world snapshot dispatched");
                peer_count + 1
            }
            other @ (WireMessage::PlayerMoved { .. } | WireMessage::WeaponFired { .. }) => {
                self.stats.ignored += 1;
                tracing::debug!(kind = %other.kind(), "ignoring client-only message from server");
                0
            }
        };
        self.stats.events += published as u64;
        published
    }
}
