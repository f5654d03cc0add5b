//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` provides a cheap-to-clone interface for sending
//! commands to the registry actor. Every method maps to exactly one command,
//! and therefore to exactly one critical section inside the actor.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `RegistryError::ChannelClosed`

use tokio::sync::{mpsc, oneshot};

use relay_core::{Attributes, Connection, ConnectionId, PeerId, RoomId};

use super::commands::{RegistryCommand, RegistryError, RegistryStats};

// ============================================================================
// Registry Handle
// ============================================================================

/// Handle for interacting with the registry actor.
///
/// # Usage
///
/// ```ignore
/// let handle = spawn_registry(EmptyRoomPolicy::Evict);
///
/// handle.register(PeerId::new("alice"), conn, Attributes::new()).await?;
/// handle.join(RoomId::new("r1"), conn).await?;
/// let targets = handle.broadcast_targets(RoomId::new("r1"), conn).await?;
/// ```
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Create a new registry handle around the actor's command sender.
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Sends a command built around a fresh oneshot and awaits the reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(build(tx))
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Register `connection` as the live handle for `peer_id`.
    ///
    /// Returns the handle that was superseded, if any. The superseded
    /// socket is not closed.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn register(
        &self,
        peer_id: PeerId,
        connection: ConnectionId,
        attributes: Attributes,
    ) -> Result<Option<ConnectionId>, RegistryError> {
        self.request(|respond_to| RegistryCommand::Register {
            peer_id,
            connection,
            attributes,
            respond_to,
        })
        .await
    }

    /// Remove the logical mapping for `peer_id`; no-op if absent.
    pub async fn unregister(&self, peer_id: PeerId) -> Result<Option<ConnectionId>, RegistryError> {
        self.request(|respond_to| RegistryCommand::Unregister {
            peer_id,
            respond_to,
        })
        .await
    }

    /// Forget a closed socket. Returns its record if it was registered.
    pub async fn unregister_connection(
        &self,
        connection: ConnectionId,
    ) -> Result<Option<Connection>, RegistryError> {
        self.request(|respond_to| RegistryCommand::UnregisterConnection {
            connection,
            respond_to,
        })
        .await
    }

    /// Resolve a logical id to its current handle.
    pub async fn resolve(&self, peer_id: PeerId) -> Result<Option<ConnectionId>, RegistryError> {
        self.request(|respond_to| RegistryCommand::Resolve {
            peer_id,
            respond_to,
        })
        .await
    }

    /// Fetch the record of an open connection.
    pub async fn describe(
        &self,
        connection: ConnectionId,
    ) -> Result<Option<Connection>, RegistryError> {
        self.request(|respond_to| RegistryCommand::Describe {
            connection,
            respond_to,
        })
        .await
    }

    /// Join a room. Returns the members after the join.
    pub async fn join(
        &self,
        room_id: RoomId,
        connection: ConnectionId,
    ) -> Result<Vec<ConnectionId>, RegistryError> {
        self.request(|respond_to| RegistryCommand::Join {
            room_id,
            connection,
            respond_to,
        })
        .await
    }

    /// Leave a room. Returns whether the connection was a member.
    pub async fn leave(
        &self,
        room_id: RoomId,
        connection: ConnectionId,
    ) -> Result<bool, RegistryError> {
        self.request(|respond_to| RegistryCommand::Leave {
            room_id,
            connection,
            respond_to,
        })
        .await
    }

    /// Leave every room. Returns the rooms that were left.
    pub async fn leave_all(&self, connection: ConnectionId) -> Result<Vec<RoomId>, RegistryError> {
        self.request(|respond_to| RegistryCommand::LeaveAll {
            connection,
            respond_to,
        })
        .await
    }

    /// Members of a room; empty for an unknown room.
    pub async fn members(&self, room_id: RoomId) -> Result<Vec<ConnectionId>, RegistryError> {
        self.request(|respond_to| RegistryCommand::Members {
            room_id,
            respond_to,
        })
        .await
    }

    /// Members of a room other than `sender`.
    pub async fn broadcast_targets(
        &self,
        room_id: RoomId,
        sender: ConnectionId,
    ) -> Result<Vec<ConnectionId>, RegistryError> {
        self.request(|respond_to| RegistryCommand::BroadcastTargets {
            room_id,
            sender,
            respond_to,
        })
        .await
    }

    /// Rooms a connection belongs to.
    pub async fn rooms_of(&self, connection: ConnectionId) -> Result<Vec<RoomId>, RegistryError> {
        self.request(|respond_to| RegistryCommand::RoomsOf {
            connection,
            respond_to,
        })
        .await
    }

    /// Snapshot of registry sizes.
    pub async fn stats(&self) -> Result<RegistryStats, RegistryError> {
        self.request(|respond_to| RegistryCommand::Stats { respond_to })
            .await
    }

    /// Check if the registry actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
