//! Relay Protocol - Wire format for signaling envelopes
//!
//! This crate provides the JSON envelope exchanged between peers through
//! the relay, its classification into a routing [`Signal`], and the small
//! set of notices the relay itself sends to clients.

pub mod envelope;
pub mod message;
pub mod parse;

pub use envelope::{SignalEnvelope, SignalType};
pub use message::ServerMessage;
pub use parse::{parse_inbound, CustomPayload, Inbound, ProtocolError, RelayKind, Signal, Target};
