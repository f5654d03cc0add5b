//! The connection model: one live socket and its handshake attributes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionId, PeerId, RoomId};

/// Attribute holding the logical identity supplied at handshake.
pub const USER_ID_ATTRIBUTE: &str = "user_id";

/// Attribute holding a room chosen at handshake time.
///
/// This is the only attribute that influences routing, and only when the
/// router is configured to take rooms from attributes.
pub const ROOM_ID_ATTRIBUTE: &str = "room_id";

/// Small string-to-string bag attached to a connection at handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`Attributes::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// The room stored at handshake, if any and non-empty.
    pub fn room_id(&self) -> Option<RoomId> {
        self.get(ROOM_ID_ATTRIBUTE)
            .filter(|r| !r.trim().is_empty())
            .map(RoomId::from)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A live connection as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Transport handle
    pub id: ConnectionId,

    /// Logical identity the connection registered under
    pub peer_id: PeerId,

    /// Handshake attributes (always contains `user_id`)
    pub attributes: Attributes,

    /// When the handshake completed
    pub connected_at: DateTime<Utc>,
}

impl Connection {
    /// Creates a connection record, storing the logical identity as the
    /// `user_id` attribute.
    pub fn new(id: ConnectionId, peer_id: PeerId, attributes: Attributes) -> Self {
        let attributes = attributes.with(USER_ID_ATTRIBUTE, peer_id.as_str());
        Self {
            id,
            peer_id,
            attributes,
            connected_at: Utc::now(),
        }
    }
}
