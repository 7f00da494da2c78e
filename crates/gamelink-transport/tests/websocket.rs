//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and connect to it
//! either with a raw `tokio-tungstenite` client or with our own
//! [`WebSocketConnector`], checking that binary messages flow both ways and
//! that a clean close surfaces as `Ok(None)`.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use gamelink_transport::{
        Connection, Transport, WebSocketConnector, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (mut client_ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);

        server_conn
            .send(b"hello from server")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (mut client_ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_connector_round_trip_with_path_suffix() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            let conn = transport.accept().await.expect("should accept");
            let data = conn.recv().await.unwrap().unwrap();
            conn.send(&data).await.unwrap();
            conn
        });

        let client = WebSocketConnector
            .connect(&format!("ws://{addr}/game"))
            .await
            .expect("connector should connect");
        client.send(&[1, 2, 3]).await.unwrap();

        let echoed = client.recv().await.unwrap().expect("echo");
        assert_eq!(echoed, vec![1, 2, 3]);
        let _server_conn = server_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_connector_refused_returns_connect_failed() {
        // Bind and immediately drop to get a port nobody listens on.
        let (transport, addr) = bind().await;
        drop(transport);

        let result = WebSocketConnector.connect(&format!("ws://{addr}")).await;

        assert!(matches!(
            result,
            Err(gamelink_transport::TransportError::ConnectFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_connection_ids_unique_across_listener_and_connector() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            let first = transport.accept().await.expect("should accept");
            let second = transport.accept().await.expect("should accept");
            (first, second)
        });

        let url = format!("ws://{addr}");
        let a = WebSocketConnector.connect(&url).await.expect("connect a");
        let b = WebSocketConnector.connect(&url).await.expect("connect b");
        let (first, second) = server_handle.await.unwrap();

        let mut ids = vec![a.id(), b.id(), first.id(), second.id()];
        ids.sort_by_key(|id| id.into_inner());
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(a.id().to_string(), format!("conn-{}", a.id().into_inner()));
    }
}
