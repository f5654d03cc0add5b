//! Relay Core - Shared domain types for the signaling relay
//!
//! This crate provides the identifiers and connection model shared between
//! the wire protocol (`relay-protocol`) and the daemon (`relayd`).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod connection;
pub mod error;
pub mod ids;

// Re-exports for convenience
pub use connection::{Attributes, Connection, ROOM_ID_ATTRIBUTE, USER_ID_ATTRIBUTE};
pub use error::{DomainError, DomainResult};
pub use ids::{ConnectionId, PeerId, RoomId};
