//! Relay daemon - room membership and signaling message routing
//!
//! This crate provides the infrastructure for the `relayd` binary:
//! - `registry` - Registry actor owning connections and rooms
//! - `router` - Envelope routing (join, leave, direct, broadcast)
//! - `listeners` - Local subscriptions to custom events
//! - `server` - WebSocket transport
//! - `config` - Layered configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         relayd                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   RelayServer   │────▶│     MessageRouter           │   │
//! │  │  (WebSocket)    │     │  (parse, pick recipients)   │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │                             │                   │
//! │           │ sockets                     │ commands          │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ConnectionHandler│     │      RegistryActor          │   │
//! │  │  (per socket)   │     │ (connections + rooms owner) │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod cli;
pub mod config;
pub mod listeners;
pub mod registry;
pub mod router;
pub mod server;
pub mod transport;
