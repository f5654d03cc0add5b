//! Registry actor commands and errors.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor, one per atomic operation
//! - `RegistryError`: Errors that can occur talking to the actor
//! - `RegistryStats`: Snapshot of registry size
//!
//! All types are designed for async message passing and follow the panic-free policy.

use relay_core::{Attributes, Connection, ConnectionId, PeerId, RoomId};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command is processed to completion before the next one is read, so
/// every variant is exactly one critical section. Each carries a oneshot
/// channel for the response.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Register a connection under a logical id, superseding any previous
    /// mapping for that id.
    ///
    /// Responds with the superseded handle, if any.
    Register {
        peer_id: PeerId,
        connection: ConnectionId,
        attributes: Attributes,
        respond_to: oneshot::Sender<Option<ConnectionId>>,
    },

    /// Remove the logical mapping for `peer_id`. No-op if absent.
    Unregister {
        peer_id: PeerId,
        respond_to: oneshot::Sender<Option<ConnectionId>>,
    },

    /// Forget a closed socket; its logical mapping is removed only if it
    /// still points at this socket.
    UnregisterConnection {
        connection: ConnectionId,
        respond_to: oneshot::Sender<Option<Connection>>,
    },

    /// Resolve a logical id to its transport handle.
    Resolve {
        peer_id: PeerId,
        respond_to: oneshot::Sender<Option<ConnectionId>>,
    },

    /// Fetch the record of an open connection.
    Describe {
        connection: ConnectionId,
        respond_to: oneshot::Sender<Option<Connection>>,
    },

    /// Add a connection to a room (idempotent).
    ///
    /// Responds with the room's members after the join.
    Join {
        room_id: RoomId,
        connection: ConnectionId,
        respond_to: oneshot::Sender<Vec<ConnectionId>>,
    },

    /// Remove a connection from one room.
    Leave {
        room_id: RoomId,
        connection: ConnectionId,
        respond_to: oneshot::Sender<bool>,
    },

    /// Remove a connection from every room.
    LeaveAll {
        connection: ConnectionId,
        respond_to: oneshot::Sender<Vec<RoomId>>,
    },

    /// List a room's members.
    Members {
        room_id: RoomId,
        respond_to: oneshot::Sender<Vec<ConnectionId>>,
    },

    /// List a room's members minus the sender, for relay fan-out.
    BroadcastTargets {
        room_id: RoomId,
        sender: ConnectionId,
        respond_to: oneshot::Sender<Vec<ConnectionId>>,
    },

    /// List the rooms a connection belongs to.
    RoomsOf {
        connection: ConnectionId,
        respond_to: oneshot::Sender<Vec<RoomId>>,
    },

    /// Snapshot of registry sizes.
    Stats {
        respond_to: oneshot::Sender<RegistryStats>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The command or response channel was closed.
    ///
    /// This typically indicates the actor was shut down.
    #[error("registry channel closed")]
    ChannelClosed,
}

// ============================================================================
// Stats
// ============================================================================

/// Sizes of the registry at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Open connections
    pub connections: usize,
    /// Addressable logical ids
    pub peers: usize,
    /// Rooms in the table
    pub rooms: usize,
}
