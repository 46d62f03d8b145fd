//! WebSocket client transport using `tokio-tungstenite`.
//!
//! [`WebSocketTransport::connect`] spawns one I/O task per socket. The task
//! owns the WebSocket stream; the synchronization loop talks to it only
//! through two unbounded channels, so neither `send` nor `close` ever
//! waits on the network.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::{CloseReason, Transport, TransportError, TransportEvent};

/// Receiving half of a [`WebSocketTransport`]: lifecycle notifications and
/// inbound frames, in arrival order.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// Commands from the transport handle to its I/O task.
enum Command {
    Frame(Vec<u8>),
    Close,
}

/// A WebSocket connection to the game server.
pub struct WebSocketTransport {
    commands: mpsc::UnboundedSender<Command>,
    closed: bool,
}

impl WebSocketTransport {
    /// Starts connecting to `url` (`ws://` or `wss://`).
    ///
    /// Returns immediately. The returned receiver yields
    /// [`TransportEvent::Opened`] once the handshake completes, or
    /// [`TransportEvent::Closed`] if it fails.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(url: &str) -> (Self, TransportEvents) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let url = url.to_owned();

        tokio::spawn(async move {
            let reason = run_socket(&url, cmd_rx, &event_tx).await;
            tracing::debug!(%url, %reason, "WebSocket task finished");
            // The receiver may already be gone if the session was dropped.
            let _ = event_tx.send(TransportEvent::Closed(reason));
        });

        (
            Self {
                commands: cmd_tx,
                closed: false,
            },
            event_rx,
        )
    }
}

impl Transport for WebSocketTransport {
    type Error = TransportError;

    fn send(&mut self, frame: Vec<u8>) -> Result<(), Self::Error> {
        self.commands
            .send(Command::Frame(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.commands.send(Command::Close);
        }
    }
}

/// Drives one socket until it closes. Returns why it closed.
async fn run_socket(
    url: &str,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> CloseReason {
    let ws = match tokio_tungstenite::connect_async(url).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            let err = TransportError::Connect(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ));
            tracing::warn!(%url, error = %err, "WebSocket connect failed");
            return CloseReason::Error(err.to_string());
        }
    };
    tracing::info!(%url, "WebSocket connected");
    if events.send(TransportEvent::Opened).is_err() {
        return CloseReason::Local;
    }

    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(Command::Frame(frame)) => {
                    if let Err(e) = sink.send(Message::Binary(frame.into())).await {
                        let err = TransportError::SendFailed(std::io::Error::new(
                            std::io::ErrorKind::BrokenPipe,
                            e,
                        ));
                        return CloseReason::Error(err.to_string());
                    }
                }
                // An explicit close, or the handle was dropped.
                Some(Command::Close) | None => {
                    let _ = sink.close().await;
                    return CloseReason::Local;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    if events.send(TransportEvent::Frame(data.into())).is_err() {
                        let _ = sink.close().await;
                        return CloseReason::Local;
                    }
                }
                Some(Ok(Message::Text(text))) => {
                    tracing::warn!(len = text.len(), "dropping text frame; protocol is binary only");
                }
                Some(Ok(Message::Close(frame))) => {
                    // Tungstenite has queued the close reply; flush it so the
                    // server sees a completed handshake.
                    let _ = sink.close().await;
                    return match frame {
                        Some(frame) => CloseReason::Remote {
                            code: Some(u16::from(frame.code)),
                            reason: frame.reason.as_str().to_owned(),
                        },
                        None => CloseReason::Remote {
                            code: None,
                            reason: String::new(),
                        },
                    };
                }
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    let err = TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    ));
                    return CloseReason::Error(err.to_string());
                }
                None => {
                    return CloseReason::Remote {
                        code: None,
                        reason: String::new(),
                    };
                }
            },
        }
    }
}
