//! Classification of raw frames into routing decisions.
//!
//! A frame is first decoded as a [`SignalEnvelope`], then reduced to a
//! [`Signal`]: the tagged union the router dispatches on. Empty strings in
//! routing fields are treated the same as missing fields.

use relay_core::{PeerId, RoomId};
use thiserror::Error;

use crate::envelope::{SignalEnvelope, SignalType};

/// Errors produced while decoding a frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame was not a valid envelope.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// A relay notice could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(String),
}

/// Kind of payload being relayed between peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Offer,
    Answer,
    Candidate,
    Custom,
}

/// Where a relayed payload should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Exactly one peer, by logical id (`to` wins over `room_id`)
    Peer(PeerId),
    /// Every member of a room except the sender
    Room(RoomId),
    /// Neither `to` nor `room_id` was given
    Unspecified,
}

/// Routing-relevant reading of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    JoinRoom { room_id: Option<RoomId> },
    LeaveRoom { room_id: Option<RoomId> },
    Relay { kind: RelayKind, target: Target },
}

/// Named custom event carried by an envelope, for local listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomPayload {
    pub name: String,
    pub data: Option<serde_json::Value>,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub signal: Signal,

    /// `from` as claimed by the sender; never used for routing
    pub claimed_from: Option<PeerId>,

    /// Present when the envelope named an `event`
    pub custom: Option<CustomPayload>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn relay(kind: RelayKind, to: Option<PeerId>, room_id: Option<RoomId>) -> Signal {
    let target = match (to, room_id) {
        (Some(peer), _) => Target::Peer(peer),
        (None, Some(room)) => Target::Room(room),
        (None, None) => Target::Unspecified,
    };
    Signal::Relay { kind, target }
}

impl From<SignalEnvelope> for Inbound {
    fn from(env: SignalEnvelope) -> Self {
        let room_id = env.room().map(RoomId::from);
        let to = non_empty(env.to).map(PeerId::from);

        let signal = match env.kind {
            SignalType::JoinRoom => Signal::JoinRoom { room_id },
            SignalType::LeaveRoom => Signal::LeaveRoom { room_id },
            SignalType::Offer => relay(RelayKind::Offer, to, room_id),
            SignalType::Answer => relay(RelayKind::Answer, to, room_id),
            SignalType::Candidate => relay(RelayKind::Candidate, to, room_id),
            SignalType::Custom => relay(RelayKind::Custom, to, room_id),
        };

        let custom = non_empty(env.event).map(|name| CustomPayload {
            name,
            data: env.data,
        });

        Self {
            signal,
            claimed_from: non_empty(env.from).map(PeerId::from),
            custom,
        }
    }
}

/// Decodes a raw frame into an [`Inbound`].
///
/// # Errors
///
/// `ProtocolError::Malformed` if the bytes are not a JSON object with a
/// known `type`.
pub fn parse_inbound(raw: &[u8]) -> Result<Inbound, ProtocolError> {
    let envelope: SignalEnvelope =
        serde_json::from_slice(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    Ok(Inbound::from(envelope))
}
