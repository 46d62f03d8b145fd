//! The seam between reconciliation and whatever draws peers.

use peerlink_protocol::{PeerId, Position2D};

/// Creates, moves and destroys the visual representation of remote peers.
///
/// The reconciler calls these in a strict per-peer order: exactly one
/// `create_peer`, any number of `move_peer`, then at most one
/// `destroy_peer`. A peer that rejoins later starts over with a fresh
/// `create_peer`.
///
/// # Example
///
/// ```
/// use peerlink_peers::PeerPresenter;
/// use peerlink_protocol::{PeerId, Position2D};
///
/// struct Sprites(u32);
///
/// impl PeerPresenter for Sprites {
///     type Handle = u32;
///
///     fn create_peer(&mut self, _id: &PeerId, _at: Position2D) -> u32 {
///         self.0 += 1;
///         self.0
///     }
///
///     fn move_peer(&mut self, _sprite: &mut u32, _id: &PeerId, _to: Position2D) {}
///
///     fn destroy_peer(&mut self, _sprite: u32, _id: &PeerId) {}
/// }
/// ```
pub trait PeerPresenter {
    /// Whatever the presenter needs to find its representation again:
    /// a sprite index, an entity id, a scene node.
    type Handle;

    /// A peer was seen for the first time (or for the first time since it
    /// left). Returns the handle the reconciler stores for it.
    fn create_peer(&mut self, peer_id: &PeerId, position: Position2D) -> Self::Handle;

    /// A known peer moved.
    fn move_peer(&mut self, handle: &mut Self::Handle, peer_id: &PeerId, position: Position2D);

    /// A known peer left. The handle is handed back for disposal.
    fn destroy_peer(&mut self, handle: Self::Handle, peer_id: &PeerId);
}
