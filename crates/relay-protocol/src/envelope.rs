//! The signaling envelope as it appears on the wire.
//!
//! ```json
//! {"type":"offer","sdp":"v=0...","from":"alice","room_id":"r1"}
//! {"type":"answer","sdp":"v=0...","from":"bob","to":"alice"}
//! {"type":"join-room","room_id":"r1"}
//! {"type":"custom","event":"chat","data":"hi","room_id":"r1"}
//! ```
//!
//! Unknown fields are ignored. Missing optional fields are absent, not errors.

use serde::{Deserialize, Serialize};

/// Kind of envelope, carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalType {
    /// SDP offer
    Offer,
    /// SDP answer
    Answer,
    /// ICE candidate
    Candidate,
    /// Application-defined payload, usually paired with `event`
    Custom,
    /// Join a room
    #[serde(alias = "join_room")]
    JoinRoom,
    /// Leave a room
    #[serde(alias = "leave_room")]
    LeaveRoom,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::Custom => "custom",
            Self::JoinRoom => "join-room",
            Self::LeaveRoom => "leave-room",
        };
        write!(f, "{name}")
    }
}

/// Signaling envelope exchanged between peers.
///
/// The relay only reads the routing fields (`type`, `to`, `room_id`,
/// `event`); `sdp`, `candidate` and `data` are carried through untouched in
/// the original bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    #[serde(rename = "type")]
    pub kind: SignalType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,

    /// Sender's logical id as claimed by the client (informational only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Direct recipient's logical id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    /// `roomID` spelling of the room key
    #[serde(default, rename = "roomID", skip_serializing_if = "Option::is_none")]
    pub room_id_upper: Option<String>,

    /// `roomId` spelling of the room key
    #[serde(default, rename = "roomId", skip_serializing_if = "Option::is_none")]
    pub room_id_camel: Option<String>,

    /// Custom event name for local dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    /// Custom event payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl SignalEnvelope {
    /// Creates an envelope of the given kind with every optional field absent.
    pub fn new(kind: SignalType) -> Self {
        Self {
            kind,
            sdp: None,
            candidate: None,
            from: None,
            to: None,
            room_id: None,
            room_id_upper: None,
            room_id_camel: None,
            event: None,
            data: None,
        }
    }

    /// The room named by the envelope under any of its accepted keys.
    ///
    /// `room_id` is preferred, then `roomID`, then `roomId`; blank values
    /// count as absent.
    pub fn room(&self) -> Option<&str> {
        [&self.room_id, &self.room_id_upper, &self.room_id_camel]
            .into_iter()
            .filter_map(|key| key.as_deref())
            .find(|room| !room.trim().is_empty())
    }
}
