//! Outbound socket table: the transport side of `Transport::send`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::Message;
use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use relay_core::ConnectionId;

use crate::transport::{Transport, TransportError};

/// Default per-socket outbound queue length, in frames
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Writer channel for one socket
pub type SocketWriter = mpsc::Sender<Message>;

/// Live socket writers keyed by transport handle.
///
/// Each socket has a writer task draining a bounded channel. `send` only
/// enqueues with `try_send`: a socket whose queue is full loses the frame
/// instead of growing without limit.
#[derive(Clone)]
pub struct SocketTable {
    writers: Arc<RwLock<HashMap<ConnectionId, SocketWriter>>>,
    buffer: usize,
    dropped: Arc<AtomicU64>,
}

impl Default for SocketTable {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_OUTBOUND_BUFFER)
    }
}

impl SocketTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table whose sockets queue at most `buffer` frames each.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            writers: Arc::new(RwLock::new(HashMap::new())),
            buffer: buffer.max(1),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates the outbound queue for `connection` and returns its
    /// receiving end for the writer task.
    pub async fn open(&self, connection: ConnectionId) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.insert(connection, tx).await;
        rx
    }

    pub async fn insert(&self, connection: ConnectionId, writer: SocketWriter) {
        self.writers.write().await.insert(connection, writer);
    }

    pub async fn remove(&self, connection: ConnectionId) -> bool {
        self.writers.write().await.remove(&connection).is_some()
    }

    pub async fn len(&self) -> usize {
        self.writers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.writers.read().await.is_empty()
    }

    /// Frames dropped because a socket's queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Text frame when the payload is UTF-8, binary otherwise.
pub fn to_message(payload: Bytes) -> Message {
    match std::str::from_utf8(&payload) {
        Ok(text) => Message::Text(text.to_owned().into()),
        Err(_) => Message::Binary(payload),
    }
}

#[async_trait]
impl Transport for SocketTable {
    async fn send(&self, to: ConnectionId, payload: Bytes) -> Result<(), TransportError> {
        let writers = self.writers.read().await;
        let writer = writers.get(&to).ok_or(TransportError::NotConnected(to))?;

        match writer.try_send(to_message(payload)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(connection = %to, "Outbound queue full, dropping frame");
                Err(TransportError::Full(to))
            }
            Err(TrySendError::Closed(_)) => Err(TransportError::Closed(to)),
        }
    }
}
