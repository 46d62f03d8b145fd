//! Typed inbound events and the channels that deliver them.
//!
//! Each kind of event has its own [`EventChannel`]. Subscribers are plain
//! closures, called synchronously in the order they subscribed, on the
//! same call stack as the frame that produced the event. There is no
//! queue and no hidden scheduling.

use std::fmt;

use peerlink_protocol::{PeerId, Position2D};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A peer announced itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerJoined {
    pub peer_id: PeerId,
    pub position: Position2D,
}

/// A peer went away.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerLeft {
    pub peer_id: PeerId,
}

/// A peer is at a new position. Snapshots arrive as a run of these.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerPositionUpdated {
    pub peer_id: PeerId,
    pub position: Position2D,
}

/// Published after every entry of a world snapshot has been published as
/// a [`PeerPositionUpdated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotApplied {
    pub peer_count: usize,
}

/// Any of the per-peer events, for consumers that take them through a
/// single entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    Joined(PeerJoined),
    Left(PeerLeft),
    PositionUpdated(PeerPositionUpdated),
}

// ---------------------------------------------------------------------------
// EventChannel
// ---------------------------------------------------------------------------

/// Handle returned by [`EventChannel::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Subscriber<E> = Box<dyn FnMut(&E)>;

/// A list of subscribers for one event type.
pub struct EventChannel<E> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Subscriber<E>)>,
}

impl<E> EventChannel<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            subscribers: Vec::new(),
        }
    }

    /// Adds a subscriber. It runs after every existing subscriber.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Removes a subscriber. Returns `false` if `id` wasn't subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Calls every subscriber with `event`, in subscription order.
    pub fn publish(&mut self, event: &E) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventChannel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
