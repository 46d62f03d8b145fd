//! `PeerlinkClient` builder and sync loop.
//!
//! This is the entry point for running a client against a game server. It
//! ties the layers together: transport → connection → sync → peers, driven
//! by a fixed-rate ticker.

use peerlink_peers::PeerPresenter;
use peerlink_protocol::{BinaryCodec, PeerIdWire};
use peerlink_tick::{SyncTicker, TickInfo};
use peerlink_transport::{CloseReason, TransportError, TransportEvents, WebSocketTransport};

use crate::{ClientConfig, ClientSession, PeerlinkError};

/// Builder for configuring a [`PeerlinkClient`].
///
/// # Example
///
/// ```rust,ignore
/// use peerlink::prelude::*;
///
/// let client = PeerlinkClient::builder()
///     .endpoint("ws://localhost:8090/ws")
///     .tick_rate_hz(30)
///     .build()?;
/// let reason = client.run(my_presenter, |session, tick| {
///     session.set_position(x, y);
/// }).await?;
/// ```
pub struct PeerlinkClientBuilder {
    config: ClientConfig,
}

impl PeerlinkClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Sets the server's WebSocket URL.
    pub fn endpoint(mut self, url: &str) -> Self {
        self.config.endpoint = url.to_string();
        self
    }

    pub fn tick_rate_hz(mut self, rate: u32) -> Self {
        self.config.tick_rate_hz = rate;
        self
    }

    pub fn peer_id_wire(mut self, wire: PeerIdWire) -> Self {
        self.config.peer_id_wire = wire;
        self
    }

    /// Sets the maximum random delay before the first tick. Zero disables
    /// it.
    pub fn tick_jitter_us(mut self, jitter_us: u64) -> Self {
        self.config.tick_jitter_us = jitter_us;
        self
    }

    /// Validates the settings and builds the client.
    pub fn build(self) -> Result<PeerlinkClient, PeerlinkError> {
        PeerlinkClient::from_config(self.config)
    }
}

impl Default for PeerlinkClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured client, ready to connect.
#[derive(Debug, Clone)]
pub struct PeerlinkClient {
    config: ClientConfig,
}

impl PeerlinkClient {
    /// Creates a new builder.
    pub fn builder() -> PeerlinkClientBuilder {
        PeerlinkClientBuilder::new()
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, PeerlinkError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts connecting and returns the session with its event stream.
    ///
    /// For callers that want to run their own loop. Must be called from
    /// within a Tokio runtime.
    pub fn connect<P: PeerPresenter + 'static>(
        &self,
        presenter: P,
    ) -> (ClientSession<WebSocketTransport, P>, TransportEvents) {
        let (transport, events) = WebSocketTransport::connect(&self.config.endpoint);
        let codec = BinaryCodec::new(self.config.peer_id_wire);
        let session = ClientSession::with_codec(transport, presenter, codec);
        tracing::info!(
            conn_id = %session.id(),
            endpoint = %self.config.endpoint,
            "connecting"
        );
        (session, events)
    }

    /// Connects and runs the sync loop until the connection closes.
    ///
    /// Each tick calls `driver` with the session, then flushes it. Inbound
    /// events are applied as they arrive between ticks. When the
    /// connection closes, from either side, every peer representation is
    /// destroyed and the close reason returned.
    ///
    /// The driver may call [`ClientSession::close`] to end the loop.
    pub async fn run<P, F>(&self, presenter: P, mut driver: F) -> Result<CloseReason, PeerlinkError>
    where
        P: PeerPresenter + 'static,
        F: FnMut(&mut ClientSession<WebSocketTransport, P>, &TickInfo),
    {
        let (mut session, mut events) = self.connect(presenter);
        let mut ticker = SyncTicker::new(self.config.tick_config());

        let reason = loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        // The I/O task always reports Closed before exiting.
                        tracing::error!(conn_id = %session.id(), "transport event stream ended unexpectedly");
                        session.clear_peers();
                        return Err(TransportError::Closed.into());
                    };
                    if let Some(reason) = session.handle_transport_event(event) {
                        break reason;
                    }
                }
                tick = ticker.wait_for_tick() => {
                    driver(&mut session, &tick);
                    if let Some(reason) = session.close_reason() {
                        break reason.clone();
                    }
                    session.flush();
                }
            }
        };

        let cleared = session.clear_peers();
        let outbound = session.outbound().stats();
        let inbound = session.inbound().stats();
        tracing::info!(
            conn_id = %session.id(),
            %reason,
            ticks = ticker.tick_count(),
            moves_sent = outbound.moves_sent,
            shots_sent = outbound.shots_sent,
            frames_received = inbound.frames,
            decode_failures = inbound.decode_failures,
            peers_cleared = cleared,
            "session ended"
        );
        Ok(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = PeerlinkClient::builder().build().unwrap();
        assert_eq!(client.config(), &ClientConfig::default());
    }

    #[test]
    fn test_builder_overrides() {
        let client = PeerlinkClient::builder()
            .endpoint("wss://game.example/ws")
            .tick_rate_hz(20)
            .peer_id_wire(PeerIdWire::U64)
            .tick_jitter_us(0)
            .build()
            .unwrap();
        let config = client.config();
        assert_eq!(config.endpoint, "wss://game.example/ws");
        assert_eq!(config.tick_rate_hz, 20);
        assert_eq!(config.peer_id_wire, PeerIdWire::U64);
        assert_eq!(config.tick_jitter_us, 0);
    }

    #[test]
    fn test_build_rejects_bad_endpoint() {
        let err = PeerlinkClient::builder()
            .endpoint("localhost:8090")
            .build()
            .unwrap_err();
        assert!(matches!(err, PeerlinkError::Config(_)));
    }
}
