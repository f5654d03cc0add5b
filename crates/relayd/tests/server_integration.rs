//! Integration tests for the WebSocket server.
//!
//! These tests run a real RelayServer on an ephemeral port and drive it with
//! tokio-tungstenite clients.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use relayd::listeners::ListenerTable;
use relayd::registry::{spawn_registry, EmptyRoomPolicy, RegistryHandle};
use relayd::router::{RoomSource, RouterConfig};
use relayd::server::{RelayServer, ServerConfig};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for a frame
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait before concluding nothing else is coming
const QUIET_PERIOD: Duration = Duration::from_millis(150);

// ============================================================================
// Test Helpers
// ============================================================================

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Running server plus the handles needed to inspect and stop it.
struct TestServer {
    addr: SocketAddr,
    registry: RegistryHandle,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(RouterConfig::default()).await
    }

    async fn spawn_with(router_config: RouterConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let registry = spawn_registry(EmptyRoomPolicy::Evict);
        let cancel_token = CancellationToken::new();

        let server = RelayServer::new(
            ServerConfig {
                bind: addr,
                ..ServerConfig::default()
            },
            registry.clone(),
            ListenerTable::new(),
            router_config,
            cancel_token.clone(),
        );

        let task = tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        Self {
            addr,
            registry,
            cancel_token,
            task: Some(task),
        }
    }

    async fn connect(&self, path: &str) -> Client {
        let url = format!("ws://{}{}", self.addr, path);
        let (ws, _) = connect_async(url).await.expect("upgrade should succeed");
        ws
    }

    /// Connects and consumes the welcome notice, which also guarantees the
    /// connection is registered.
    async fn connect_peer(&self, path: &str) -> Client {
        let mut ws = self.connect(path).await;
        let welcome = recv_json(&mut ws).await;
        assert_eq!(welcome["type"], "welcome");
        ws
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn send_text(ws: &mut Client, text: &str) {
    ws.send(Message::text(text)).await.unwrap();
}

async fn recv_text(ws: &mut Client) -> String {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("socket error");
        match msg {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn recv_json(ws: &mut Client) -> Value {
    serde_json::from_str(&recv_text(ws).await).unwrap()
}

/// Asserts no data frame arrives within the quiet period.
async fn assert_silent(ws: &mut Client) {
    if let Ok(Some(Ok(msg))) = timeout(QUIET_PERIOD, ws.next()).await {
        assert!(
            !matches!(msg, Message::Text(_) | Message::Binary(_)),
            "unexpected frame: {msg:?}"
        );
    }
}

async fn join(ws: &mut Client, room: &str) {
    send_text(ws, &format!(r#"{{"type":"join-room","room_id":"{room}"}}"#)).await;
}

async fn wait_for_connections(registry: &RegistryHandle, expected: usize) {
    for _ in 0..100 {
        if registry.stats().await.unwrap().connections == expected {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("registry never reached {expected} connections");
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_welcome_on_connect() {
    let server = TestServer::spawn().await;
    let mut ws = server.connect("/ws/alice").await;

    let welcome = recv_json(&mut ws).await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["peer_id"], "alice");
    assert!(welcome["connection_id"].is_u64());
}

#[tokio::test]
async fn test_two_peers_exchange_offer_in_room() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect_peer("/ws/alice").await;
    let mut bob = server.connect_peer("/ws/bob").await;

    join(&mut alice, "r1").await;
    let notice = recv_json(&mut alice).await;
    assert_eq!(notice["type"], "peer-joined");
    assert_eq!(notice["peer_id"], "alice");

    join(&mut bob, "r1").await;
    for ws in [&mut alice, &mut bob] {
        let notice = recv_json(ws).await;
        assert_eq!(notice["type"], "peer-joined");
        assert_eq!(notice["peer_id"], "bob");
        assert_eq!(notice["room_id"], "r1");
    }

    let offer = r#"{"type":"offer","sdp":"v=0\r\n","room_id":"r1","from":"bob"}"#;
    send_text(&mut bob, offer).await;

    assert_eq!(recv_text(&mut alice).await, offer);
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_direct_answer() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect_peer("/ws/alice").await;
    let mut bob = server.connect_peer("/ws/bob").await;

    let answer = r#"{"type":"answer","to":"alice","sdp":"v=0"}"#;
    send_text(&mut bob, answer).await;

    assert_eq!(recv_text(&mut alice).await, answer);
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_room_from_query_string() {
    let server = TestServer::spawn_with(RouterConfig {
        room_source: RoomSource::Attribute,
        ..RouterConfig::default()
    })
    .await;

    let mut alice = server.connect_peer("/ws/alice?room_id=lobby").await;
    let mut bob = server.connect_peer("/ws/bob?room_id=lobby").await;

    send_text(&mut alice, r#"{"type":"join-room"}"#).await;
    assert_eq!(recv_json(&mut alice).await["room_id"], "lobby");

    send_text(&mut bob, r#"{"type":"join-room"}"#).await;
    recv_json(&mut alice).await;
    recv_json(&mut bob).await;

    let candidate = r#"{"type":"candidate","candidate":"candidate:1 1 udp 1 10.0.0.1 9 typ host"}"#;
    send_text(&mut alice, candidate).await;
    assert_eq!(recv_text(&mut bob).await, candidate);
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect_peer("/ws/alice").await;
    let mut bob = server.connect_peer("/ws/bob").await;

    send_text(&mut bob, "not json").await;
    send_text(&mut bob, r#"{"type":"teleport"}"#).await;

    let answer = r#"{"type":"answer","to":"alice"}"#;
    send_text(&mut bob, answer).await;
    assert_eq!(recv_text(&mut alice).await, answer);
}

#[tokio::test]
async fn test_disconnect_unregisters() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect_peer("/ws/alice").await;
    join(&mut alice, "r1").await;
    recv_json(&mut alice).await;

    let stats = server.registry.stats().await.unwrap();
    assert_eq!(stats.connections, 1);
    assert_eq!(stats.rooms, 1);

    alice.close(None).await.unwrap();
    wait_for_connections(&server.registry, 0).await;

    let stats = server.registry.stats().await.unwrap();
    assert_eq!(stats.peers, 0);
    assert_eq!(stats.rooms, 0);
}

#[tokio::test]
async fn test_invalid_peer_id_rejected() {
    let server = TestServer::spawn().await;
    let url = format!("ws://{}/ws/{}", server.addr, "x".repeat(300));

    assert!(connect_async(url).await.is_err());
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::spawn().await;
    let _alice = server.connect_peer("/ws/alice").await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    timeout(RECV_TIMEOUT, stream.read_to_string(&mut response))
        .await
        .expect("health check timed out")
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""status":"ok""#));
    assert!(response.contains(r#""connections":1"#));
    assert!(response.contains(r#""dropped_frames":0"#));
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let mut server = TestServer::spawn().await;
    let task = server.task.take().unwrap();
    server.cancel_token.cancel();

    timeout(RECV_TIMEOUT, task)
        .await
        .expect("server should stop after cancellation")
        .unwrap();
}
