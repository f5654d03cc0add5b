//! WebSocket transport for the relay.
//!
//! The server:
//! - Accepts `GET /ws/{id}` upgrades, `{id}` being the peer's logical identity
//! - Spawns a ConnectionHandler for each socket
//! - Owns the socket table the router sends through
//! - Serves `GET /health` with registry sizes
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   RelayServer   │
//! │  TcpListener    │
//! └───────┬─────────┘
//!         │ upgrade
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionHandler│────▶│  MessageRouter  │────▶│ RegistryHandle  │
//! │   (per socket)  │     │                 │     │                 │
//! └─────────────────┘     └────────┬────────┘     └─────────────────┘
//!                                  │ Transport::send
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │   SocketTable   │
//!                         └─────────────────┘
//! ```

mod connection;
mod sockets;

pub use connection::ConnectionHandler;
pub use sockets::{to_message, SocketTable, SocketWriter, DEFAULT_OUTBOUND_BUFFER};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_core::{Attributes, ConnectionId, PeerId, ROOM_ID_ATTRIBUTE};

use crate::listeners::ListenerTable;
use crate::registry::RegistryHandle;
use crate::router::{MessageRouter, RouterConfig};

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default maximum inbound frame size (1 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1_048_576;

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: SocketAddr,

    /// Largest inbound frame accepted, in bytes
    pub max_message_size: usize,

    /// Frames queued per socket before further sends to it are dropped
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    router: MessageRouter,
    sockets: SocketTable,
    cancel_token: CancellationToken,
    connection_counter: Arc<AtomicU64>,
    max_message_size: usize,
}

/// Query string accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
struct UpgradeQuery {
    room_id: Option<String>,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    connections: usize,
    peers: usize,
    rooms: usize,
    dropped_frames: u64,
}

/// WebSocket server for the relay.
pub struct RelayServer {
    config: ServerConfig,
    router: MessageRouter,
    sockets: SocketTable,
    cancel_token: CancellationToken,
}

impl RelayServer {
    /// Creates a server and the router that sends through its socket table.
    pub fn new(
        config: ServerConfig,
        registry: RegistryHandle,
        listeners: ListenerTable,
        router_config: RouterConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        let sockets = SocketTable::with_buffer(config.outbound_buffer);
        let router = MessageRouter::new(
            registry,
            Arc::new(sockets.clone()),
            listeners,
            router_config,
        );

        Self {
            config,
            router,
            sockets,
            cancel_token,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The router wired to this server's sockets.
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Builds the axum application.
    pub fn app(&self) -> Router {
        let state = AppState {
            router: self.router.clone(),
            sockets: self.sockets.clone(),
            cancel_token: self.cancel_token.clone(),
            connection_counter: Arc::new(AtomicU64::new(1)),
            max_message_size: self.config.max_message_size,
        };

        Router::new()
            .route("/ws/{id}", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(state)
    }

    /// Binds the configured address and serves until cancelled.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind)
            .await
            .map_err(|e| ServerError::Bind {
                addr: self.config.bind,
                error: e.to_string(),
            })?;

        self.serve(listener).await
    }

    /// Serves on an already-bound listener until cancelled.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        info!(addr = %addr, "Relay server listening");

        let app = self.app();
        let shutdown = self.cancel_token.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        info!("Relay server stopped");
        Ok(())
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    Query(query): Query<UpgradeQuery>,
    State(state): State<AppState>,
) -> Response {
    let peer_id = match PeerId::parse(id) {
        Ok(peer_id) => peer_id,
        Err(e) => {
            debug!(error = %e, "Rejecting upgrade with invalid peer id");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let mut attributes = Attributes::new();
    if let Some(room_id) = query.room_id.filter(|r| !r.trim().is_empty()) {
        attributes.set(ROOM_ID_ATTRIBUTE, room_id);
    }

    let connection = ConnectionId::new(state.connection_counter.fetch_add(1, Ordering::Relaxed));

    debug!(peer_id = %peer_id, connection = %connection, "Upgrading connection");

    let handler = ConnectionHandler::new(
        connection,
        peer_id,
        attributes,
        state.router.clone(),
        state.sockets.clone(),
        state.cancel_token.clone(),
    );

    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handler.run(socket))
}

async fn health_handler(State(state): State<AppState>) -> Response {
    match state.router.registry().stats().await {
        Ok(stats) => Json(HealthResponse {
            status: "ok",
            connections: stats.connections,
            peers: stats.peers,
            rooms: stats.rooms,
            dropped_frames: state.sockets.dropped(),
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Server error: {0}")]
    Serve(String),
}
