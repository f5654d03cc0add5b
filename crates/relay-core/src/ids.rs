//! Identifiers used by the relay.
//!
//! Two kinds of identity exist for every client:
//! - [`PeerId`]: the logical identity chosen by the caller (the `{id}` in `/ws/{id}`),
//!   used to address a peer directly.
//! - [`ConnectionId`]: the transport handle assigned by the server for one socket.
//!
//! Rooms hold `ConnectionId`s, never `PeerId`s.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, DomainResult};

/// Maximum length accepted for logical and room identifiers.
pub const MAX_ID_LEN: usize = 256;

fn validate(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::EmptyIdentifier {
            field: field.to_string(),
        });
    }
    if value.len() > MAX_ID_LEN {
        return Err(DomainError::IdentifierTooLong {
            field: field.to_string(),
            len: value.len(),
            max: MAX_ID_LEN,
        });
    }
    Ok(())
}

/// Logical identity of a peer, supplied by the caller at handshake time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Creates a PeerId without validation.
    ///
    /// The transport is trusted to have produced a usable id; use
    /// [`PeerId::parse`] for untrusted input.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a PeerId, rejecting empty or oversized input.
    pub fn parse(id: impl Into<String>) -> DomainResult<Self> {
        let id = id.into();
        validate("peer id", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PeerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a RoomId, rejecting empty or oversized input.
    pub fn parse(id: impl Into<String>) -> DomainResult<Self> {
        let id = id.into();
        validate("room id", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque transport handle for one live socket.
///
/// Assigned by the server from a monotonically increasing counter, so a
/// handle is never reused within a process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_display_and_as_str() {
        let id = PeerId::new("alice");
        assert_eq!(id.as_str(), "alice");
        assert_eq!(id.to_string(), "alice");
    }

    #[test]
    fn test_peer_id_parse_rejects_empty() {
        assert!(matches!(
            PeerId::parse("   "),
            Err(DomainError::EmptyIdentifier { .. })
        ));
        assert!(PeerId::parse("bob").is_ok());
    }

    #[test]
    fn test_room_id_parse_rejects_too_long() {
        let long = "r".repeat(MAX_ID_LEN + 1);
        let err = RoomId::parse(long).unwrap_err();
        assert!(matches!(err, DomainError::IdentifierTooLong { len, .. } if len == MAX_ID_LEN + 1));
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).get(), 7);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&RoomId::new("r1")).unwrap();
        assert_eq!(json, "\"r1\"");
        let json = serde_json::to_string(&ConnectionId::new(3)).unwrap();
        assert_eq!(json, "3");
    }
}
