//! Integration tests for the WebSocket client transport.
//!
//! Each test runs a real `tokio-tungstenite` server on an OS-assigned port
//! and drives the client side through a [`Connection`], the same way the
//! client session does.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use peerlink_transport::{
        CloseReason, Connection, ConnectionEvent, TransportEvent, TransportEvents,
        WebSocketTransport,
    };
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Binds a listener on a random port and returns it with its `ws://` URL.
    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("should have local addr");
        (listener, format!("ws://{addr}"))
    }

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("handshake should succeed")
    }

    async fn next_event(events: &mut TransportEvents) -> TransportEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event should arrive in time")
            .expect("event channel should be open")
    }

    #[tokio::test]
    async fn test_open_send_and_receive_binary_frames() {
        let (listener, url) = listen().await;
        let (transport, mut events) = WebSocketTransport::connect(&url);
        let mut conn = Connection::new(transport);

        let mut server = accept(&listener).await;

        // Connecting → Open
        let ev = next_event(&mut events).await;
        assert_eq!(conn.handle(ev), Some(ConnectionEvent::Opened));

        // --- Client sends, server receives ---
        assert!(conn.send(vec![0x01, 0x00, 1, 2, 3, 4, 5, 6, 7, 8]));
        let msg = server.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0x01, 0x00, 1, 2, 3, 4, 5, 6, 7, 8]);

        // --- Server sends, client receives exactly one frame ---
        server
            .send(Message::Binary(vec![0x11, 1, 0, b'7'].into()))
            .await
            .unwrap();
        let ev = next_event(&mut events).await;
        assert_eq!(
            conn.handle(ev),
            Some(ConnectionEvent::Frame(vec![0x11, 1, 0, b'7']))
        );
    }

    #[tokio::test]
    async fn test_server_close_surfaces_remote_reason() {
        let (listener, url) = listen().await;
        let (transport, mut events) = WebSocketTransport::connect(&url);
        let mut conn = Connection::new(transport);
        let mut server = accept(&listener).await;

        let ev = next_event(&mut events).await;
        conn.handle(ev);

        server.close(None).await.unwrap();

        let ev = next_event(&mut events).await;
        match conn.handle(ev) {
            Some(ConnectionEvent::Closed(CloseReason::Remote { .. })) => {}
            other => panic!("expected remote close, got {other:?}"),
        }
        assert!(conn.is_closed());
        assert!(!conn.send(vec![1]));
    }

    #[tokio::test]
    async fn test_server_close_is_acknowledged() {
        let (listener, url) = listen().await;
        let (transport, mut events) = WebSocketTransport::connect(&url);
        let mut conn = Connection::new(transport);
        let mut server = accept(&listener).await;
        let ev = next_event(&mut events).await;
        conn.handle(ev);

        server.close(None).await.unwrap();

        // The client completes the handshake with its own close frame
        // instead of just dropping the TCP stream.
        let reply = tokio::time::timeout(Duration::from_secs(5), server.next())
            .await
            .expect("close reply should arrive in time");
        assert!(
            matches!(reply, Some(Ok(Message::Close(_)))),
            "expected a close reply, got {reply:?}"
        );

        let ev = next_event(&mut events).await;
        assert!(matches!(
            conn.handle(ev),
            Some(ConnectionEvent::Closed(CloseReason::Remote { .. }))
        ));
    }

    #[tokio::test]
    async fn test_text_frames_are_ignored() {
        let (listener, url) = listen().await;
        let (transport, mut events) = WebSocketTransport::connect(&url);
        let mut conn = Connection::new(transport);
        let mut server = accept(&listener).await;
        let ev = next_event(&mut events).await;
        conn.handle(ev);

        server.send(Message::Text("hello".into())).await.unwrap();
        server.send(Message::Binary(vec![0x13, 0, 0].into())).await.unwrap();

        // The text frame never shows up; the binary one does.
        let ev = next_event(&mut events).await;
        assert_eq!(ev, TransportEvent::Frame(vec![0x13, 0, 0]));
    }

    #[tokio::test]
    async fn test_local_close_reaches_server() {
        let (listener, url) = listen().await;
        let (transport, mut events) = WebSocketTransport::connect(&url);
        let mut conn = Connection::new(transport);
        let mut server = accept(&listener).await;
        let ev = next_event(&mut events).await;
        conn.handle(ev);

        assert_eq!(conn.close(), Some(CloseReason::Local));

        // Server observes the close handshake (or end of stream).
        let msg = tokio::time::timeout(Duration::from_secs(5), server.next())
            .await
            .expect("server should observe close");
        assert!(matches!(msg, Some(Ok(Message::Close(_))) | None));

        // The transport's own close notification is swallowed.
        let ev = next_event(&mut events).await;
        assert!(matches!(ev, TransportEvent::Closed(_)));
        assert_eq!(conn.handle(ev), None);
    }

    #[tokio::test]
    async fn test_connect_refused_reports_error_close() {
        // Bind then drop so the port is (almost certainly) closed.
        let (listener, url) = listen().await;
        drop(listener);

        let (transport, mut events) = WebSocketTransport::connect(&url);
        let mut conn = Connection::new(transport);

        let ev = next_event(&mut events).await;
        match conn.handle(ev) {
            Some(ConnectionEvent::Closed(CloseReason::Error(_))) => {}
            other => panic!("expected error close, got {other:?}"),
        }
    }
}
