//! Tick-level behavior of the outbound tracker over a live connection
//! state machine.

use std::cell::RefCell;
use std::rc::Rc;

use peerlink_protocol::{BinaryCodec, Codec, PlayerControlState, WireMessage};
use peerlink_sync::OutboundTracker;
use peerlink_transport::{CloseReason, Connection, Transport, TransportError, TransportEvent};
use proptest::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

#[derive(Clone, Default)]
struct Wire(Rc<RefCell<Vec<Vec<u8>>>>);

impl Wire {
    fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

struct WireTransport(Wire);

impl Transport for WireTransport {
    type Error = TransportError;

    fn send(&mut self, frame: Vec<u8>) -> Result<(), Self::Error> {
        (self.0).0.borrow_mut().push(frame);
        Ok(())
    }

    fn close(&mut self) {}
}

fn open() -> (Connection<WireTransport>, Wire) {
    let wire = Wire::default();
    let mut conn = Connection::new(WireTransport(wire.clone()));
    conn.handle(TransportEvent::Opened);
    (conn, wire)
}

/// One setter call made by the game between flushes.
#[derive(Debug, Clone)]
enum Setter {
    Position(f32, f32),
    Control(u8),
}

impl Setter {
    fn apply(&self, tracker: &mut OutboundTracker) -> bool {
        match *self {
            Setter::Position(x, y) => tracker.set_position(x, y),
            Setter::Control(bits) => {
                tracker.set_control_state(PlayerControlState::from_bits(bits).unwrap())
            }
        }
    }
}

/// A small value space, so repeats and reverts within a tick are common.
fn setter() -> impl Strategy<Value = Setter> {
    prop_oneof![
        (0u8..3, 0u8..3).prop_map(|(x, y)| Setter::Position(x as f32, y as f32)),
        (0u8..16).prop_map(Setter::Control),
    ]
}

/// Setter calls grouped by tick.
fn ticks() -> impl Strategy<Value = Vec<Vec<Setter>>> {
    prop::collection::vec(prop::collection::vec(setter(), 0..6), 1..60)
}

// =========================================================================
// Properties
// =========================================================================

proptest! {
    /// Property: any setter sequence within one tick yields at most one
    /// message, and only when the tracker was dirty
    #[test]
    fn test_at_most_one_message_per_tick(ticks in ticks()) {
        let (mut conn, wire) = open();
        let mut tracker = OutboundTracker::new();

        for setters in &ticks {
            let before = wire.len();
            let mut changed = false;
            for s in setters {
                changed |= s.apply(&mut tracker);
            }

            let was_dirty = tracker.is_dirty();
            let sent = tracker.flush(&mut conn);
            let after = wire.len();

            prop_assert!(after - before <= 1);
            prop_assert_eq!(sent, after - before == 1);
            prop_assert_eq!(sent, was_dirty);
            if !changed {
                prop_assert!(!sent, "sent without any change");
            }

            // A second flush in the same tick never sends.
            prop_assert!(!tracker.flush(&mut conn));
            prop_assert_eq!(wire.len(), after);
        }
    }

    /// Property: consecutive PlayerMoved frames always differ
    #[test]
    fn test_consecutive_messages_differ(ticks in ticks()) {
        let (mut conn, wire) = open();
        let mut tracker = OutboundTracker::new();

        for setters in &ticks {
            for s in setters {
                s.apply(&mut tracker);
            }
            tracker.flush(&mut conn);
        }

        let codec = BinaryCodec::default();
        let frames = wire.0.borrow();
        for pair in frames.windows(2) {
            prop_assert_ne!(&pair[0], &pair[1]);
        }
        for frame in frames.iter() {
            let is_move = matches!(
                codec.decode(frame).unwrap(),
                Some(WireMessage::PlayerMoved { .. })
            );
            prop_assert!(is_move);
        }
    }

    /// Property: the last frame sent carries the state held at that flush
    #[test]
    fn test_last_message_matches_held_state(ticks in ticks()) {
        let (mut conn, wire) = open();
        let mut tracker = OutboundTracker::new();

        for setters in &ticks {
            for s in setters {
                s.apply(&mut tracker);
            }
            tracker.flush(&mut conn);
        }

        if let Some(last) = wire.0.borrow().last() {
            let held = tracker.state();
            prop_assert_eq!(
                BinaryCodec::default().decode(last).unwrap(),
                Some(WireMessage::PlayerMoved {
                    control: held.control,
                    position: held.position,
                })
            );
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn test_state_changed_while_closed_is_never_sent() {
    let (mut conn, wire) = open();
    let mut tracker = OutboundTracker::new();

    tracker.set_position(1.0, 1.0);
    assert!(tracker.flush(&mut conn));

    conn.handle(TransportEvent::Closed(CloseReason::Remote {
        code: None,
        reason: String::new(),
    }));

    for i in 0..10 {
        tracker.set_position(i as f32 + 2.0, 0.0);
        assert!(!tracker.flush(&mut conn));
    }
    assert_eq!(wire.len(), 1);
    assert!(tracker.is_dirty());
}
