//! Outbound change coalescing.
//!
//! The local player's input and movement systems call the setters as often
//! as they like, typically every frame. The tracker remembers whether
//! anything actually changed and, once per tick, turns that into at most
//! one `PlayerMoved` frame.
//!
//! ```text
//! set_position / set_control_state ──→ [held state + dirty]
//!                                              │
//!                           flush() once per tick, if dirty and open
//!                                              ▼
//!                                   encode PlayerMoved → Connection
//! ```

use peerlink_protocol::{BinaryCodec, Codec, PlayerControlState, Position2D, WireMessage};
use peerlink_transport::{Connection, Transport};

/// The local player's latest control and position, plus the dirty flag.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalOutboundState {
    pub control: PlayerControlState,
    pub position: Position2D,
    /// `true` iff the held state differs from what was last sent.
    pub dirty: bool,
}

/// Counters for what the tracker has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// `PlayerMoved` frames handed to the connection.
    pub moves_sent: u64,
    /// `WeaponFired` frames handed to the connection.
    pub shots_sent: u64,
    /// Flushes that had something to send but the connection wasn't open.
    pub flushes_deferred: u64,
}

/// Holds the local player's state and coalesces changes into one
/// outbound message per tick.
pub struct OutboundTracker<C: Codec = BinaryCodec> {
    codec: C,
    state: LocalOutboundState,
    /// What the last successful `PlayerMoved` carried. `None` until the
    /// first send.
    last_sent: Option<(PlayerControlState, Position2D)>,
    stats: TrackerStats,
}

impl OutboundTracker<BinaryCodec> {
    pub fn new() -> Self {
        Self::with_codec(BinaryCodec::default())
    }
}

impl Default for OutboundTracker<BinaryCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> OutboundTracker<C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            state: LocalOutboundState::default(),
            last_sent: None,
            stats: TrackerStats::default(),
        }
    }

    pub fn state(&self) -> &LocalOutboundState {
        &self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Replaces the held control state if any flag differs.
    ///
    /// Returns `true` if the held state changed. An identical call leaves
    /// both the state and the dirty flag untouched.
    ///
    /// Dirty means "differs from the last `PlayerMoved` sent", not "was
    /// touched since the last flush". Changing a value and then changing it
    /// back before the next flush leaves the tracker clean, and that flush
    /// sends nothing.
    pub fn set_control_state(&mut self, control: PlayerControlState) -> bool {
        if self.state.control == control {
            return false;
        }
        self.state.control = control;
        self.refresh_dirty();
        true
    }

    /// Replaces the held position if either coordinate differs.
    ///
    /// Coordinates compare by bit pattern, matching what would go on the
    /// wire; see [`Position2D::same_bits`].
    ///
    /// As with [`set_control_state`](Self::set_control_state), moving away
    /// and back to the last sent position within one tick clears the dirty
    /// flag again: the server already has that position.
    pub fn set_position(&mut self, x: f32, y: f32) -> bool {
        let position = Position2D::new(x, y);
        if self.state.position.same_bits(&position) {
            return false;
        }
        self.state.position = position;
        self.refresh_dirty();
        true
    }

    /// Sends one `PlayerMoved` if the state is dirty and the connection is
    /// open. Call once per tick.
    ///
    /// Returns `true` if a frame was handed to the connection. Calling it
    /// again without an intervening change sends nothing.
    pub fn flush<T: Transport>(&mut self, conn: &mut Connection<T>) -> bool {
        if !self.state.dirty {
            return false;
        }
        if !conn.is_open() {
            self.stats.flushes_deferred += 1;
            return false;
        }

        let LocalOutboundState {
            control, position, ..
        } = self.state;
        let frame = match self
            .codec
            .encode(&WireMessage::PlayerMoved { control, position })
        {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode PlayerMoved");
                return false;
            }
        };

        if !conn.send(frame) {
            return false;
        }
        self.last_sent = Some((control, position));
        self.state.dirty = false;
        self.stats.moves_sent += 1;
        tracing::trace!(
            conn_id = %conn.id(),
            x = position.x,
            y = position.y,
            control = control.to_bits(),
            "sent PlayerMoved"
        );
        true
    }

    /// Sends a `WeaponFired` immediately.
    ///
    /// Shots are discrete events, not state, so they bypass coalescing.
    /// Dropped without error if the connection isn't open.
    pub fn fire_weapon<T: Transport>(
        &mut self,
        conn: &mut Connection<T>,
        angle: f32,
        power: f32,
    ) -> bool {
        let frame = match self.codec.encode(&WireMessage::WeaponFired { angle, power }) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode WeaponFired");
                return false;
            }
        };
        let sent = conn.send(frame);
        if sent {
            self.stats.shots_sent += 1;
            tracing::debug!(conn_id = %conn.id(), angle, power, "sent WeaponFired");
        }
        sent
    }

    fn refresh_dirty(&mut self) {
        self.state.dirty = match &self.last_sent {
            Some((control, position)) => {
                *control != self.state.control || !position.same_bits(&self.state.position)
            }
            None => true,
        };
    }
}
