//! Per-peer reconciliation.
//!
//! Each peer id moves through a small re-entrant state machine:
//!
//! ```text
//!            joined / position-updated
//!   Absent ─────────────────────────────→ Present ──┐ joined / position-updated
//!     ▲                                      │  ◀───┘ (move_peer)
//!     └──────────────── left ────────────────┘
//!                    (destroy_peer)
//! ```
//!
//! A position update for a peer we have never seen creates it. Snapshots
//! and joins can race on the server, and a peer showing up in a snapshot
//! before its join is still a peer.

use std::collections::HashMap;
use std::fmt;

use peerlink_protocol::{PeerId, Position2D};
use peerlink_sync::PeerEvent;

use crate::PeerPresenter;

/// What one event did to the peer map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// A new record was created and `create_peer` called.
    Created,
    /// An existing record moved and `move_peer` called.
    Moved,
    /// A record was removed and `destroy_peer` called.
    Removed,
    /// Nothing happened: a leave for a peer we don't know.
    Ignored,
}

impl fmt::Display for Reconciled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Moved => write!(f, "moved"),
            Self::Removed => write!(f, "removed"),
            Self::Ignored => write!(f, "ignored"),
        }
    }
}

/// Local state for one remote peer.
#[derive(Debug)]
pub struct PeerRecord<H> {
    pub position: Position2D,
    /// The presenter's handle from `create_peer`.
    pub handle: H,
}

/// Keeps one record per present peer and drives a [`PeerPresenter`].
///
/// Records are keyed by [`PeerId`] only; the wire encoding of the id has
/// already been normalized away by the codec.
pub struct PeerReconciler<P: PeerPresenter> {
    presenter: P,
    /// Present peers only. Every key holds a handle the presenter has
    /// not destroyed yet.
    peers: HashMap<PeerId, PeerRecord<P::Handle>>,
}

impl<P: PeerPresenter> PeerReconciler<P> {
    pub fn new(presenter: P) -> Self {
        Self {
            presenter,
            peers: HashMap::new(),
        }
    }

    /// A peer announced itself. A duplicate join for a present peer is
    /// treated as a position update.
    pub fn on_peer_joined(&mut self, peer_id: &PeerId, position: Position2D) -> Reconciled {
        self.upsert(peer_id, position)
    }

    /// A peer moved. An unknown peer is created on first sight.
    pub fn on_peer_position_updated(
        &mut self,
        peer_id: &PeerId,
        position: Position2D,
    ) -> Reconciled {
        self.upsert(peer_id, position)
    }

    /// A peer left. Unknown peers are ignored.
    pub fn on_peer_left(&mut self, peer_id: &PeerId) -> Reconciled {
        match self.peers.remove(peer_id) {
            // The handle moves into destroy_peer and is never seen again.
            Some(record) => {
                self.presenter.destroy_peer(record.handle, peer_id);
                tracing::debug!(%peer_id, "peer removed");
                Reconciled::Removed
            }
            None => {
                tracing::debug!(%peer_id, "leave for unknown peer ignored");
                Reconciled::Ignored
            }
        }
    }

    /// Applies any per-peer event.
    pub fn apply(&mut self, event: &PeerEvent) -> Reconciled {
        match event {
            PeerEvent::Joined(e) => self.on_peer_joined(&e.peer_id, e.position),
            PeerEvent::Left(e) => self.on_peer_left(&e.peer_id),
            PeerEvent::PositionUpdated(e) => self.on_peer_position_updated(&e.peer_id, e.position),
        }
    }

    /// Destroys every peer and empties the map. Returns how many were
    /// destroyed.
    pub fn clear(&mut self) -> usize {
        let count = self.peers.len();
        // Drain order is unspecified; presenters must not depend on it.
        for (peer_id, record) in self.peers.drain() {
            self.presenter.destroy_peer(record.handle, &peer_id);
        }
        if count > 0 {
            tracing::debug!(count, "all peers cleared");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&PeerRecord<P::Handle>> {
        self.peers.get(peer_id)
    }

    pub fn position(&self, peer_id: &PeerId) -> Option<Position2D> {
        self.peers.get(peer_id).map(|r| r.position)
    }

    /// Iterates present peers in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &PeerRecord<P::Handle>)> {
        self.peers.iter()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    fn upsert(&mut self, peer_id: &PeerId, position: Position2D) -> Reconciled {
        match self.peers.get_mut(peer_id) {
            // Present: one move_peer, never a second create_peer.
            Some(record) => {
                record.position = position;
                self.presenter.move_peer(&mut record.handle, peer_id, position);
                tracing::trace!(%peer_id, x = position.x, y = position.y, "peer moved");
                Reconciled::Moved
            }
            None => {
                let handle = self.presenter.create_peer(peer_id, position);
                self.peers
                    .insert(peer_id.clone(), PeerRecord { position, handle });
                tracing::debug!(%peer_id, x = position.x, y = position.y, "peer created");
                Reconciled::Created
            }
        }
    }
}

impl<P: PeerPresenter> fmt::Debug for PeerReconciler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerReconciler")
            .field("peers", &self.peers.len())
            .finish()
    }
}
