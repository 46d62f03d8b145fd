//! The connection state machine.
//!
//! ```text
//!   Connecting ──(Opened)──→ Open
//!       │                      │
//!       └──(Closed / close())──┴──→ Closed   (terminal)
//! ```
//!
//! A `Connection` owns its transport until it reaches `Closed`, at which
//! point the transport is closed and dropped. That happens exactly once
//! no matter how many close notifications or `close()` calls follow.

use crate::{CloseReason, ConnectionId, Transport, TransportEvent};

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// What a [`Connection`] passes up after handling a [`TransportEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection just became `Open`.
    Opened,
    /// One inbound frame, delivered only while `Open`.
    Frame(Vec<u8>),
    /// The connection just became `Closed`. Emitted once per connection.
    Closed(CloseReason),
}

/// One client connection to the game server.
pub struct Connection<T: Transport> {
    id: ConnectionId,
    state: ConnectionState,
    /// `None` once closed; taking it is what releases the socket.
    transport: Option<T>,
    frames_sent: u64,
    frames_dropped: u64,
}

impl<T: Transport> Connection<T> {
    /// Wraps a transport that is still connecting.
    pub fn new(transport: T) -> Self {
        Self::with_id(ConnectionId::next(), transport)
    }

    pub fn with_id(id: ConnectionId, transport: T) -> Self {
        tracing::debug!(conn_id = %id, "connection created");
        Self {
            id,
            state: ConnectionState::Connecting,
            transport: Some(transport),
            frames_sent: 0,
            frames_dropped: 0,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Frames handed to the transport so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Sends that were silently dropped because the connection wasn't
    /// open, plus inbound frames that arrived while not open.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Borrows the transport. `None` once closed.
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Applies one transport notification and returns what the owner
    /// needs to act on, if anything.
    pub fn handle(&mut self, event: TransportEvent) -> Option<ConnectionEvent> {
        match event {
            TransportEvent::Opened => match self.state {
                ConnectionState::Connecting => {
                    self.state = ConnectionState::Open;
                    tracing::info!(conn_id = %self.id, "connection open");
                    Some(ConnectionEvent::Opened)
                }
                // Open is reachable only from Connecting.
                state => {
                    tracing::debug!(conn_id = %self.id, ?state, "ignoring open notification");
                    None
                }
            },
            // Frames never reach the owner outside Open, in either direction.
            TransportEvent::Frame(frame) => {
                if self.is_open() {
                    Some(ConnectionEvent::Frame(frame))
                } else {
                    self.frames_dropped += 1;
                    tracing::trace!(
                        conn_id = %self.id,
                        state = ?self.state,
                        len = frame.len(),
                        "dropping inbound frame"
                    );
                    None
                }
            }
            // A late transport close after close() is absorbed here.
            TransportEvent::Closed(reason) => {
                if self.release() {
                    tracing::info!(conn_id = %self.id, %reason, "connection closed");
                    Some(ConnectionEvent::Closed(reason))
                } else {
                    None
                }
            }
        }
    }

    /// Hands a frame to the transport.
    ///
    /// Returns `false` without error if the connection isn't open. Sending
    /// while connecting or after close is an expected condition, not a
    /// failure.
    pub fn send(&mut self, frame: Vec<u8>) -> bool {
        if !self.is_open() {
            self.frames_dropped += 1;
            tracing::trace!(conn_id = %self.id, state = ?self.state, "send dropped");
            return false;
        }
        // Open implies the transport is still held.
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };
        match transport.send(frame) {
            Ok(()) => {
                self.frames_sent += 1;
                true
            }
            Err(e) => {
                // The transport reports its own close; nothing to do here.
                tracing::debug!(conn_id = %self.id, error = %e, "transport send failed");
                false
            }
        }
    }

    /// Closes the connection from the local side.
    ///
    /// Returns `Some(CloseReason::Local)` the first time, so the caller can
    /// surface the lifecycle change, and `None` on every later call.
    pub fn close(&mut self) -> Option<CloseReason> {
        if self.release() {
            tracing::info!(conn_id = %self.id, "connection closed locally");
            Some(CloseReason::Local)
        } else {
            None
        }
    }

    /// Moves to `Closed` and releases the transport. Returns `false` if it
    /// was already closed.
    fn release(&mut self) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        self.state = ConnectionState::Closed;
        // The transport is closed exactly once and then dropped.
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Log {
        sent: Vec<Vec<u8>>,
        closes: usize,
        fail_sends: bool,
    }

    struct FakeTransport(Rc<RefCell<Log>>);

    impl Transport for FakeTransport {
        type Error = crate::TransportError;

        fn send(&mut self, frame: Vec<u8>) -> Result<(), Self::Error> {
            let mut log = self.0.borrow_mut();
            if log.fail_sends {
                return Err(crate::TransportError::Closed);
            }
            log.sent.push(frame);
            Ok(())
        }

        fn close(&mut self) {
            self.0.borrow_mut().closes += 1;
        }
    }

    fn connection() -> (Connection<FakeTransport>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        (Connection::new(FakeTransport(Rc::clone(&log))), log)
    }

    fn remote_close() -> TransportEvent {
        TransportEvent::Closed(CloseReason::Remote {
            code: Some(1000),
            reason: String::new(),
        })
    }

    #[test]
    fn test_starts_connecting() {
        let (conn, _) = connection();
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(conn.transport().is_some());
    }

    #[test]
    fn test_opened_transitions_to_open() {
        let (mut conn, _) = connection();
        assert_eq!(conn.handle(TransportEvent::Opened), Some(ConnectionEvent::Opened));
        assert!(conn.is_open());
        // A second open notification changes nothing.
        assert_eq!(conn.handle(TransportEvent::Opened), None);
    }

    #[test]
    fn test_send_while_connecting_is_silently_dropped() {
        let (mut conn, log) = connection();
        assert!(!conn.send(vec![1, 2, 3]));
        assert!(log.borrow().sent.is_empty());
        assert_eq!(conn.frames_dropped(), 1);
    }

    #[test]
    fn test_send_while_open_reaches_transport() {
        let (mut conn, log) = connection();
        conn.handle(TransportEvent::Opened);
        assert!(conn.send(vec![9]));
        assert_eq!(log.borrow().sent, vec![vec![9]]);
        assert_eq!(conn.frames_sent(), 1);
    }

    #[test]
    fn test_failed_transport_send_returns_false() {
        let (mut conn, log) = connection();
        conn.handle(TransportEvent::Opened);
        log.borrow_mut().fail_sends = true;
        assert!(!conn.send(vec![9]));
        assert_eq!(conn.frames_sent(), 0);
        assert!(conn.is_open());
    }

    #[test]
    fn test_frames_delivered_only_while_open() {
        let (mut conn, _) = connection();
        assert_eq!(conn.handle(TransportEvent::Frame(vec![1])), None);
        conn.handle(TransportEvent::Opened);
        assert_eq!(
            conn.handle(TransportEvent::Frame(vec![2])),
            Some(ConnectionEvent::Frame(vec![2]))
        );
        conn.close();
        assert_eq!(conn.handle(TransportEvent::Frame(vec![3])), None);
        assert_eq!(conn.frames_dropped(), 2);
    }

    #[test]
    fn test_remote_close_surfaces_once_and_releases_transport() {
        let (mut conn, log) = connection();
        conn.handle(TransportEvent::Opened);

        let first = conn.handle(remote_close());
        assert!(matches!(first, Some(ConnectionEvent::Closed(CloseReason::Remote { .. }))));
        assert_eq!(conn.handle(remote_close()), None);
        assert_eq!(conn.close(), None);

        assert!(conn.is_closed());
        assert!(conn.transport().is_none());
        assert_eq!(log.borrow().closes, 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut conn, log) = connection();
        conn.handle(TransportEvent::Opened);
        assert_eq!(conn.close(), Some(CloseReason::Local));
        assert_eq!(conn.close(), None);
        assert_eq!(conn.handle(remote_close()), None);
        assert_eq!(log.borrow().closes, 1);
    }

    #[test]
    fn test_close_while_connecting() {
        let (mut conn, log) = connection();
        assert_eq!(conn.close(), Some(CloseReason::Local));
        assert!(conn.is_closed());
        // A late open notification can't revive a closed connection.
        assert_eq!(conn.handle(TransportEvent::Opened), None);
        assert!(conn.is_closed());
        assert_eq!(log.borrow().closes, 1);
    }

    #[test]
    fn test_send_after_close_is_noop() {
        let (mut conn, log) = connection();
        conn.handle(TransportEvent::Opened);
        conn.close();
        assert!(!conn.send(vec![1]));
        assert!(log.borrow().sent.is_empty());
    }
}
