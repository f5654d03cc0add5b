//! Logical identity → transport handle mapping.
//!
//! Owned exclusively by the [`RegistryActor`](super::RegistryActor); nothing
//! here is synchronised on its own.

use std::collections::HashMap;

use relay_core::{Attributes, Connection, ConnectionId, PeerId};

/// Registry of live connections.
///
/// Two maps are kept in step:
/// - `by_peer`: the addressable mapping used for direct messages. One entry
///   per logical id; the newest registration wins.
/// - `connections`: every open socket, including ones whose logical id was
///   superseded by a later handshake.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    by_peer: HashMap<PeerId, ConnectionId>,
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the mapping for `peer_id`.
    ///
    /// Returns the handle that was previously mapped to this logical id, if
    /// it differs from `connection`. The superseded socket is left open and
    /// keeps its connection record.
    pub fn register(
        &mut self,
        peer_id: PeerId,
        connection: ConnectionId,
        attributes: Attributes,
    ) -> Option<ConnectionId> {
        let record = Connection::new(connection, peer_id.clone(), attributes);
        self.connections.insert(connection, record);

        self.by_peer
            .insert(peer_id, connection)
            .filter(|previous| *previous != connection)
    }

    /// Removes the logical mapping for `peer_id`. No-op if absent.
    pub fn unregister(&mut self, peer_id: &PeerId) -> Option<ConnectionId> {
        self.by_peer.remove(peer_id)
    }

    /// Forgets a closed socket.
    ///
    /// The logical mapping is only removed when it still resolves to this
    /// connection, so a newer registration under the same id survives.
    pub fn unregister_connection(&mut self, connection: ConnectionId) -> Option<Connection> {
        let record = self.connections.remove(&connection)?;

        if self.by_peer.get(&record.peer_id) == Some(&connection) {
            self.by_peer.remove(&record.peer_id);
        }

        Some(record)
    }

    /// Resolves a logical id to its current transport handle.
    pub fn resolve(&self, peer_id: &PeerId) -> Option<ConnectionId> {
        self.by_peer.get(peer_id).copied()
    }

    /// Looks up an open connection by handle.
    pub fn get(&self, connection: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection)
    }

    /// Number of open connections (superseded ones included).
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of addressable logical ids.
    pub fn peer_count(&self) -> usize {
        self.by_peer.len()
    }
}
