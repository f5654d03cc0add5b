//! Connection registry and room table, owned by a single actor.
//!
//! The actor is the relay's concurrency guard: every read or write of
//! membership state is one `RegistryCommand`, handled to completion before
//! the next. Callers hold a cheap-to-clone `RegistryHandle`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   RegistryCommand   ┌──────────────────────────┐
//! │  MessageRouter  │────(mpsc channel)──▶│      RegistryActor       │
//! │ (per connection)│◀───(oneshot reply)──│ ConnectionRegistry       │
//! └────────┬────────┘                     │ RoomTable                │
//!          │                              └──────────────────────────┘
//!          │ Transport::send (after the reply, outside the actor)
//!          ▼
//!     peer sockets
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()` or `.expect()` in production code
//! - Channel operations handle closure gracefully

use tokio::sync::mpsc;

mod actor;
mod commands;
mod connections;
mod handle;
mod rooms;

pub use actor::RegistryActor;
pub use commands::{RegistryCommand, RegistryError, RegistryStats};
pub use connections::ConnectionRegistry;
pub use handle::RegistryHandle;
pub use rooms::{EmptyRoomPolicy, RoomTable};

/// Default command mailbox size
pub const COMMAND_BUFFER: usize = 256;

/// Spawn the registry actor with the default mailbox size.
///
/// # Example
///
/// ```no_run
/// use relayd::registry::{spawn_registry, EmptyRoomPolicy};
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry(EmptyRoomPolicy::Evict);
///     let stats = handle.stats().await;
/// }
/// ```
pub fn spawn_registry(policy: EmptyRoomPolicy) -> RegistryHandle {
    spawn_registry_with_buffer(policy, COMMAND_BUFFER)
}

/// Spawn the registry actor with an explicit mailbox size.
pub fn spawn_registry_with_buffer(policy: EmptyRoomPolicy, buffer: usize) -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer.max(1));

    let actor = RegistryActor::new(cmd_rx, policy);
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx)
}
