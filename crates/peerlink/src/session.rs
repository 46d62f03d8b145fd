//! One client session: a connection plus both sync directions and the
//! peer map, wired together.
//!
//! ```text
//! TransportEvent ──→ Connection ──Frame──→ InboundDispatcher ──→ PeerReconciler ──→ PeerPresenter
//!                        ▲
//! setters ──→ OutboundTracker ──flush()
//! ```
//!
//! Single-threaded: the reconciler is shared with the dispatcher's
//! subscribers through `Rc<RefCell<_>>`, so a session is `!Send` and lives
//! on the task that drives it.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use peerlink_peers::{PeerPresenter, PeerReconciler};
use peerlink_protocol::{BinaryCodec, PlayerControlState};
use peerlink_sync::{EventChannel, InboundDispatcher, OutboundTracker};
use peerlink_transport::{
    CloseReason, Connection, ConnectionEvent, ConnectionId, ConnectionState, Transport,
    TransportEvent,
};

/// Published once when the connection's handshake completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connected {
    pub conn_id: ConnectionId,
}

/// A connection with outbound coalescing, inbound dispatch and peer
/// reconciliation attached.
pub struct ClientSession<T: Transport, P: PeerPresenter + 'static> {
    connection: Connection<T>,
    outbound: OutboundTracker,
    inbound: InboundDispatcher,
    peers: Rc<RefCell<PeerReconciler<P>>>,
    connected: EventChannel<Connected>,
    /// Set once, by whichever side closes first.
    close_reason: Option<CloseReason>,
}

impl<T: Transport, P: PeerPresenter + 'static> ClientSession<T, P> {
    /// Wraps a still-connecting transport with the default codec.
    pub fn new(transport: T, presenter: P) -> Self {
        Self::with_codec(transport, presenter, BinaryCodec::default())
    }

    pub fn with_codec(transport: T, presenter: P, codec: BinaryCodec) -> Self {
        let peers = Rc::new(RefCell::new(PeerReconciler::new(presenter)));
        let mut inbound = InboundDispatcher::with_codec(codec);

        // Snapshot entries arrive as position updates, so the reconciler
        // needs no snapshot_applied subscription.

        let p = Rc::clone(&peers);
        inbound.peer_joined().subscribe(move |e| {
            p.borrow_mut().on_peer_joined(&e.peer_id, e.position);
        });
        let p = Rc::clone(&peers);
        inbound.peer_position_updated().subscribe(move |e| {
            p.borrow_mut()
                .on_peer_position_updated(&e.peer_id, e.position);
        });
        let p = Rc::clone(&peers);
        inbound.peer_left().subscribe(move |e| {
            p.borrow_mut().on_peer_left(&e.peer_id);
        });

        Self {
            connection: Connection::new(transport),
            outbound: OutboundTracker::with_codec(codec),
            inbound,
            peers,
            connected: EventChannel::new(),
            close_reason: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    pub fn outbound(&self) -> &OutboundTracker {
        &self.outbound
    }

    /// The dispatcher, for subscribing to additional events such as
    /// `snapshot_applied`.
    pub fn inbound_mut(&mut self) -> &mut InboundDispatcher {
        &mut self.inbound
    }

    pub fn inbound(&self) -> &InboundDispatcher {
        &self.inbound
    }

    /// Subscribers run when the connection opens. Subscribe before the
    /// first [`handle_transport_event`](Self::handle_transport_event).
    pub fn connected(&mut self) -> &mut EventChannel<Connected> {
        &mut self.connected
    }

    /// Borrows the peer map.
    ///
    /// Don't hold the borrow across [`handle_transport_event`](Self::handle_transport_event):
    /// inbound frames update the map and would panic on the live borrow.
    pub fn peers(&self) -> Ref<'_, PeerReconciler<P>> {
        self.peers.borrow()
    }

    pub fn peers_mut(&self) -> RefMut<'_, PeerReconciler<P>> {
        self.peers.borrow_mut()
    }

    /// Why the connection closed, once it has.
    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.as_ref()
    }

    /// Feeds one transport notification through the session.
    ///
    /// Inbound frames are fully decoded and reconciled before this
    /// returns. Returns the close reason the one time the connection
    /// closes.
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> Option<CloseReason> {
        match self.connection.handle(event)? {
            ConnectionEvent::Opened => {
                let conn_id = self.connection.id();
                tracing::info!(%conn_id, "session connected");
                self.connected.publish(&Connected { conn_id });
                None
            }
            // Decoding and reconciliation finish before the next event.
            ConnectionEvent::Frame(frame) => {
                self.inbound.on_frame(&frame);
                None
            }
            ConnectionEvent::Closed(reason) => {
                self.close_reason = Some(reason.clone());
                Some(reason)
            }
        }
    }

    pub fn set_control_state(&mut self, control: PlayerControlState) -> bool {
        self.outbound.set_control_state(control)
    }

    pub fn set_position(&mut self, x: f32, y: f32) -> bool {
        self.outbound.set_position(x, y)
    }

    /// Sends a shot immediately; see [`OutboundTracker::fire_weapon`].
    pub fn fire_weapon(&mut self, angle: f32, power: f32) -> bool {
        self.outbound
            .fire_weapon(&mut self.connection, angle, power)
    }

    /// Sends pending local state. Call once per tick.
    pub fn flush(&mut self) -> bool {
        self.outbound.flush(&mut self.connection)
    }

    /// Closes the connection. Returns `Some(CloseReason::Local)` the first
    /// time only.
    pub fn close(&mut self) -> Option<CloseReason> {
        // None if the remote side already closed.
        let reason = self.connection.close()?;
        self.close_reason = Some(reason.clone());
        Some(reason)
    }

    /// Destroys every peer representation. Returns how many there were.
    pub fn clear_peers(&mut self) -> usize {
        self.peers.borrow_mut().clear()
    }
}

#[cfg(test)]
mod tests {
    use peerlink_protocol::{Codec, PeerId, PeerPosition, Position2D, WireMessage};
    use peerlink_transport::TransportError;

    use super::*;

    #[derive(Clone, Default)]
    struct Sent(Rc<RefCell<Vec<Vec<u8>>>>);

    struct FakeTransport(Sent);

    impl Transport for FakeTransport {
        type Error = TransportError;

        fn send(&mut self, frame: Vec<u8>) -> Result<(), Self::Error> {
            (self.0).0.borrow_mut().push(frame);
            Ok(())
        }

        fn close(&mut self) {}
    }

    #[derive(Default)]
    struct Names(Vec<String>);

    impl PeerPresenter for Names {
        type Handle = ();

        fn create_peer(&mut self, peer_id: &PeerId, _position: Position2D) {
            self.0.push(format!("+{peer_id}"));
        }

        fn move_peer(&mut self, _handle: &mut (), _peer_id: &PeerId, _position: Position2D) {}

        fn destroy_peer(&mut self, _handle: (), peer_id: &PeerId) {
            self.0.push(format!("-{peer_id}"));
        }
    }

    fn open_session() -> (ClientSession<FakeTransport, Names>, Sent) {
        let sent = Sent::default();
        let mut session = ClientSession::new(FakeTransport(sent.clone()), Names::default());
        assert_eq!(session.handle_transport_event(TransportEvent::Opened), None);
        (session, sent)
    }

    fn frame(msg: WireMessage) -> TransportEvent {
        TransportEvent::Frame(BinaryCodec::default().encode(&msg).unwrap())
    }

    #[test]
    fn test_starts_connecting() {
        let session = ClientSession::new(FakeTransport(Sent::default()), Names::default());
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert!(session.peers().is_empty());
    }

    #[test]
    fn test_open_notifies_connected_subscribers() {
        let mut session = ClientSession::new(FakeTransport(Sent::default()), Names::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        session
            .connected()
            .subscribe(move |e: &Connected| s.borrow_mut().push(e.conn_id));

        assert_eq!(session.handle_transport_event(TransportEvent::Opened), None);
        // A duplicate open is swallowed by the connection.
        assert_eq!(session.handle_transport_event(TransportEvent::Opened), None);

        assert_eq!(*seen.borrow(), vec![session.id()]);
        assert_eq!(session.state(), ConnectionState::Open);
    }

    #[test]
    fn test_inbound_frames_reach_the_presenter() {
        let (mut session, _) = open_session();

        session.handle_transport_event(frame(WireMessage::WorldSnapshot {
            peers: vec![
                PeerPosition {
                    peer_id: PeerId::from("1"),
                    position: Position2D::ORIGIN,
                },
                PeerPosition {
                    peer_id: PeerId::from("2"),
                    position: Position2D::ORIGIN,
                },
            ],
        }));
        session.handle_transport_event(frame(WireMessage::PeerLeft {
            peer_id: PeerId::from("1"),
        }));

        let peers = session.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers.presenter().0, vec!["+1", "+2", "-1"]);
    }

    #[test]
    fn test_frames_before_open_are_dropped() {
        let mut session = ClientSession::new(FakeTransport(Sent::default()), Names::default());
        session.handle_transport_event(frame(WireMessage::PeerJoined {
            peer_id: PeerId::from("early"),
            position: Position2D::ORIGIN,
        }));
        assert!(session.peers().is_empty());
        assert_eq!(session.inbound().stats().frames, 0);
    }

    #[test]
    fn test_flush_sends_once_per_change() {
        let (mut session, sent) = open_session();
        session.set_position(1.0, 1.0);
        session.set_control_state(PlayerControlState::new(true, false, false, false));
        assert!(session.flush());
        assert!(!session.flush());
        assert_eq!(sent.0.borrow().len(), 1);
    }

    #[test]
    fn test_remote_close_reported_once() {
        let (mut session, _) = open_session();
        let reason = CloseReason::Remote {
            code: Some(1000),
            reason: "bye".into(),
        };
        assert_eq!(
            session.handle_transport_event(TransportEvent::Closed(reason.clone())),
            Some(reason.clone())
        );
        assert_eq!(
            session.handle_transport_event(TransportEvent::Closed(CloseReason::Local)),
            None
        );
        assert_eq!(session.close_reason(), Some(&reason));
        assert_eq!(session.close(), None);
    }

    #[test]
    fn test_local_close_stops_sending() {
        let (mut session, sent) = open_session();
        assert_eq!(session.close(), Some(CloseReason::Local));
        assert_eq!(session.close(), None);

        session.set_position(4.0, 4.0);
        assert!(!session.flush());
        assert!(!session.fire_weapon(1.0, 1.0));
        assert!(sent.0.borrow().is_empty());
        assert_eq!(session.close_reason(), Some(&CloseReason::Local));
    }

    #[test]
    fn test_clear_peers_destroys_all() {
        let (mut session, _) = open_session();
        for id in ["a", "b"] {
            session.handle_transport_event(frame(WireMessage::PeerJoined {
                peer_id: PeerId::from(id),
                position: Position2D::ORIGIN,
            }));
        }
        assert_eq!(session.clear_peers(), 2);
        assert!(session.peers().is_empty());
    }
}
