//! Notices sent by the relay itself (as opposed to relayed peer payloads).

use relay_core::{ConnectionId, PeerId, RoomId};
use serde::{Deserialize, Serialize};

use crate::parse::ProtocolError;

/// Messages originated by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Sent to a connection right after its handshake
    Welcome {
        peer_id: PeerId,
        connection_id: ConnectionId,
    },

    /// Sent to the members of a room when a peer joins it
    PeerJoined { room_id: RoomId, peer_id: PeerId },
}

impl ServerMessage {
    pub fn welcome(peer_id: PeerId, connection_id: ConnectionId) -> Self {
        Self::Welcome {
            peer_id,
            connection_id,
        }
    }

    pub fn peer_joined(room_id: RoomId, peer_id: PeerId) -> Self {
        Self::PeerJoined { room_id, peer_id }
    }

    /// Encodes the notice as a JSON text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}
