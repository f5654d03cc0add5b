//! Per-socket handler.
//!
//! Each upgraded WebSocket gets its own `ConnectionHandler` that:
//! - Registers a writer in the socket table and announces the connection
//! - Feeds inbound frames to the router, in arrival order
//! - Announces the disconnect exactly once when the socket ends
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Socket errors end the connection; they never affect other sockets

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_core::{Attributes, ConnectionId, PeerId};

use super::sockets::SocketTable;
use crate::router::MessageRouter;

/// Handler for a single socket.
pub struct ConnectionHandler {
    /// Transport handle assigned by the server
    connection: ConnectionId,

    /// Logical identity from the upgrade path
    peer_id: PeerId,

    /// Handshake attributes
    attributes: Attributes,

    router: MessageRouter,

    sockets: SocketTable,

    cancel_token: CancellationToken,
}

impl ConnectionHandler {
    pub fn new(
        connection: ConnectionId,
        peer_id: PeerId,
        attributes: Attributes,
        router: MessageRouter,
        sockets: SocketTable,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            connection,
            peer_id,
            attributes,
            router,
            sockets,
            cancel_token,
        }
    }

    /// Runs the handler until the socket closes or the server shuts down.
    pub async fn run(self, socket: WebSocket) {
        let connection = self.connection;
        let (mut sink, mut stream) = socket.split();
        let mut rx = self.sockets.open(connection).await;

        let mut writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        if let Err(e) = self
            .router
            .on_connect(self.peer_id.clone(), connection, self.attributes.clone())
            .await
        {
            warn!(
                connection = %connection,
                error = %e,
                "Rejecting connection, registry unavailable"
            );
            self.sockets.remove(connection).await;
            writer.abort();
            return;
        }

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    debug!(connection = %connection, "Closing connection for shutdown");
                    break;
                }

                _ = &mut writer => {
                    debug!(connection = %connection, "Socket writer finished");
                    break;
                }

                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            let raw = Bytes::copy_from_slice(text.as_str().as_bytes());
                            self.router.on_message(connection, raw).await;
                        }
                        Some(Ok(Message::Binary(raw))) => {
                            self.router.on_message(connection, raw).await;
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            debug!(connection = %connection, error = %e, "Socket read failed");
                            break;
                        }
                    }
                }
            }
        }

        self.router.on_disconnect(connection).await;
        self.sockets.remove(connection).await;
        writer.abort();

        info!(peer_id = %self.peer_id, connection = %connection, "Socket closed");
    }
}
