//! Integration tests for the in-memory transport.
//!
//! These drive both ends of a connection through the public traits, the
//! same way the server and a test client do.

#[cfg(feature = "memory")]
mod memory {
    use std::net::SocketAddr;

    use pocketgate_transport::{Connection, MemoryTransport, Transport, TransportError};

    fn addr() -> SocketAddr {
        "10.0.0.7:19132".parse().expect("valid addr")
    }

    #[tokio::test]
    async fn test_memory_accept_and_send_receive() {
        let (mut transport, connector) = MemoryTransport::pair();
        let mut peer = connector.connect(addr()).expect("should connect");

        let server_conn = transport.accept().await.expect("should accept");
        assert_eq!(server_conn.id(), peer.id());
        assert_eq!(server_conn.remote_addr(), addr());

        peer.send(&[0xfe, 1, 2, 3]).expect("client send");
        let got = server_conn.recv().await.expect("recv ok");
        assert_eq!(got, Some(vec![0xfe, 1, 2, 3]));

        server_conn.send(&[9, 8]).await.expect("server send");
        assert_eq!(peer.recv().await, Some(vec![9, 8]));
    }

    #[tokio::test]
    async fn test_memory_datagrams_keep_order_and_boundaries() {
        let (mut transport, connector) = MemoryTransport::pair();
        let peer = connector.connect(addr()).expect("should connect");
        let server_conn = transport.accept().await.expect("should accept");

        for i in 0..5u8 {
            peer.send(&vec![i; i as usize + 1]).expect("send");
        }
        for i in 0..5u8 {
            let got = server_conn.recv().await.expect("recv").expect("open");
            assert_eq!(got, vec![i; i as usize + 1]);
        }
    }

    #[tokio::test]
    async fn test_memory_server_close_ends_peer_stream() {
        let (mut transport, connector) = MemoryTransport::pair();
        let mut peer = connector.connect(addr()).expect("should connect");
        let server_conn = transport.accept().await.expect("should accept");

        server_conn.close().await.expect("close");
        assert_eq!(peer.recv().await, None);

        let err = server_conn.send(&[1]).await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_memory_peer_close_yields_none_on_server() {
        let (mut transport, connector) = MemoryTransport::pair();
        let mut peer = connector.connect(addr()).expect("should connect");
        let server_conn = transport.accept().await.expect("should accept");

        peer.close();
        assert!(server_conn.recv().await.expect("recv ok").is_none());
        assert!(peer.send(&[1]).is_err());
    }

    #[tokio::test]
    async fn test_memory_shutdown_stops_accept() {
        let (mut transport, _connector) = MemoryTransport::pair();
        transport.shutdown().await.expect("shutdown");
        let result = transport.accept().await;
        assert!(matches!(result, Err(TransportError::Shutdown)));
    }

    #[tokio::test]
    async fn test_memory_connector_after_transport_dropped_fails() {
        let (transport, connector) = MemoryTransport::pair();
        drop(transport);
        assert!(matches!(
            connector.connect(addr()),
            Err(TransportError::Shutdown)
        ));
    }

    #[tokio::test]
    async fn test_memory_ids_are_unique_per_connection() {
        let (mut transport, connector) = MemoryTransport::pair();
        let a = connector.connect(addr()).expect("a");
        let b = connector.connect(addr()).expect("b");
        assert_ne!(a.id(), b.id());

        let first = transport.accept().await.expect("accept a");
        let second = transport.accept().await.expect("accept b");
        assert_eq!(first.id(), a.id());
        assert_eq!(second.id(), b.id());
    }
}
