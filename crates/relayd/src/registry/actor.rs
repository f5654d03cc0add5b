//! Registry actor - owns all connection and room state and processes commands.
//!
//! The RegistryActor is the single owner of the `ConnectionRegistry` and the
//! `RoomTable`. It receives commands via an mpsc channel and handles them one
//! at a time, which makes it the relay's only synchronisation point.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Response send failures (caller went away) are ignored

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::commands::{RegistryCommand, RegistryStats};
use super::connections::ConnectionRegistry;
use super::rooms::{EmptyRoomPolicy, RoomTable};

// ============================================================================
// Registry Actor
// ============================================================================

/// The registry actor - owns all membership state.
///
/// # Thread Safety
///
/// The actor runs in a single task and processes commands sequentially. No
/// command awaits anything, so a slow peer can never hold up a mutation:
/// network sends happen in the caller after the response arrives.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Logical id → handle
    connections: ConnectionRegistry,

    /// Room → member handles
    rooms: RoomTable,
}

impl RegistryActor {
    /// Creates a new registry actor.
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>, policy: EmptyRoomPolicy) -> Self {
        Self {
            receiver,
            connections: ConnectionRegistry::new(),
            rooms: RoomTable::new(policy),
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    pub async fn run(mut self) {
        info!(policy = ?self.rooms.policy(), "Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(
            connections = self.connections.len(),
            rooms = self.rooms.room_count(),
            "Registry actor stopped"
        );
    }

    /// Dispatches a command to the appropriate handler.
    ///
    /// Response send errors are ignored: the caller may have dropped its
    /// receiver.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                peer_id,
                connection,
                attributes,
                respond_to,
            } => {
                let superseded = self
                    .connections
                    .register(peer_id.clone(), connection, attributes);

                match superseded {
                    Some(previous) => info!(
                        peer_id = %peer_id,
                        connection = %connection,
                        superseded = %previous,
                        "Connection registered, superseding previous handle"
                    ),
                    None => debug!(
                        peer_id = %peer_id,
                        connection = %connection,
                        total = self.connections.len(),
                        "Connection registered"
                    ),
                }

                let _ = respond_to.send(superseded);
            }
            RegistryCommand::Unregister {
                peer_id,
                respond_to,
            } => {
                let removed = self.connections.unregister(&peer_id);
                let _ = respond_to.send(removed);
            }
            RegistryCommand::UnregisterConnection {
                connection,
                respond_to,
            } => {
                let removed = self.connections.unregister_connection(connection);
                if let Some(ref record) = removed {
                    debug!(
                        peer_id = %record.peer_id,
                        connection = %connection,
                        remaining = self.connections.len(),
                        "Connection unregistered"
                    );
                }
                let _ = respond_to.send(removed);
            }
            RegistryCommand::Resolve {
                peer_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.connections.resolve(&peer_id));
            }
            RegistryCommand::Describe {
                connection,
                respond_to,
            } => {
                let _ = respond_to.send(self.connections.get(connection).cloned());
            }
            RegistryCommand::Join {
                room_id,
                connection,
                respond_to,
            } => {
                let members = self.rooms.join(room_id.clone(), connection);
                debug!(
                    room_id = %room_id,
                    connection = %connection,
                    members = members.len(),
                    "Joined room"
                );
                let _ = respond_to.send(members);
            }
            RegistryCommand::Leave {
                room_id,
                connection,
                respond_to,
            } => {
                let removed = self.rooms.leave(&room_id, connection);
                let _ = respond_to.send(removed);
            }
            RegistryCommand::LeaveAll {
                connection,
                respond_to,
            } => {
                let left = self.rooms.leave_all(connection);
                if !left.is_empty() {
                    debug!(
                        connection = %connection,
                        rooms = left.len(),
                        "Evicted from all rooms"
                    );
                }
                let _ = respond_to.send(left);
            }
            RegistryCommand::Members {
                room_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.rooms.members(&room_id));
            }
            RegistryCommand::BroadcastTargets {
                room_id,
                sender,
                respond_to,
            } => {
                let _ = respond_to.send(self.rooms.members_except(&room_id, sender));
            }
            RegistryCommand::RoomsOf {
                connection,
                respond_to,
            } => {
                let _ = respond_to.send(self.rooms.rooms_of(connection));
            }
            RegistryCommand::Stats { respond_to } => {
                let _ = respond_to.send(RegistryStats {
                    connections: self.connections.len(),
                    peers: self.connections.peer_count(),
                    rooms: self.rooms.room_count(),
                });
            }
        }
    }
}
