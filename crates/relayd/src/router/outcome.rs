//! What the router did with one inbound frame.

use std::fmt;

use relay_core::{ConnectionId, PeerId, RoomId};

/// Why a frame produced no routing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not a valid envelope
    Malformed,
    /// Frame attributed to a handle that is not (or no longer) registered
    UnknownSender,
    /// Room operation without a resolvable room
    NoRoom,
    /// Relay envelope with neither a recipient nor a room
    NoTarget,
    /// The registry actor has stopped
    RegistryUnavailable,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed envelope"),
            Self::UnknownSender => write!(f, "unknown sender"),
            Self::NoRoom => write!(f, "no room"),
            Self::NoTarget => write!(f, "no recipient or room"),
            Self::RegistryUnavailable => write!(f, "registry unavailable"),
        }
    }
}

/// Result of routing one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Sender joined a room
    Joined {
        room_id: RoomId,
        /// Members after the join, sender included
        members: usize,
    },

    /// Sender asked to leave a room
    Left { room_id: RoomId, was_member: bool },

    /// Payload addressed to one peer
    Direct {
        to: PeerId,
        /// `None` when the recipient is not registered
        recipient: Option<ConnectionId>,
        delivered: bool,
    },

    /// Payload fanned out to a room
    Broadcast {
        room_id: RoomId,
        /// Members other than the sender
        recipients: usize,
        /// Sends the transport accepted
        delivered: usize,
    },

    /// Nothing was routed
    Dropped(DropReason),
}

impl RouteOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped(_))
    }
}
