//! Message router - decides who receives each inbound frame.
//!
//! The router sits between the transport and the registry actor:
//!
//! - `on_connect` registers the socket and optionally welcomes it
//! - `on_message` parses the envelope, asks the registry for recipients,
//!   then sends the **original bytes** to them
//! - `on_disconnect` unregisters the socket, then evicts it from all rooms
//!
//! Recipients are always computed by a single registry command and sent
//! after the reply, so no socket write ever happens while membership state
//! is held. Delivery is best-effort and at-most-once: send failures are
//! logged, never retried, never reported to the sender.

mod outcome;

pub use outcome::{DropReason, RouteOutcome};

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use relay_core::{Attributes, Connection, ConnectionId, PeerId, RoomId};
use relay_protocol::{parse_inbound, ServerMessage, Signal, Target};

use crate::listeners::{CustomEvent, ListenerTable};
use crate::registry::{RegistryError, RegistryHandle};
use crate::transport::Transport;

/// Where a connection's room comes from for joins and room broadcasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomSource {
    /// The envelope's `room_id` field
    #[default]
    Envelope,
    /// The `room_id` attribute stored at handshake; envelope rooms are ignored
    Attribute,
}

/// Router policy switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub room_source: RoomSource,

    /// Send a `welcome` notice to each new connection
    pub welcome: bool,

    /// Send a `peer-joined` notice to a room's members (joiner included)
    pub announce_joins: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            room_source: RoomSource::Envelope,
            welcome: true,
            announce_joins: true,
        }
    }
}

/// Routes inbound frames to their recipients. Cheap to clone.
#[derive(Clone)]
pub struct MessageRouter {
    registry: RegistryHandle,
    transport: Arc<dyn Transport>,
    listeners: ListenerTable,
    config: RouterConfig,
}

impl MessageRouter {
    pub fn new(
        registry: RegistryHandle,
        transport: Arc<dyn Transport>,
        listeners: ListenerTable,
        config: RouterConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            listeners,
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn listeners(&self) -> &ListenerTable {
        &self.listeners
    }

    /// A socket completed its handshake (`Connecting → Open`).
    ///
    /// # Errors
    ///
    /// `RegistryError::ChannelClosed` if the registry is gone; the transport
    /// should close the socket.
    pub async fn on_connect(
        &self,
        peer_id: PeerId,
        connection: ConnectionId,
        attributes: Attributes,
    ) -> Result<(), RegistryError> {
        self.registry
            .register(peer_id.clone(), connection, attributes)
            .await?;

        info!(peer_id = %peer_id, connection = %connection, "Peer connected");

        if self.config.welcome {
            self.notify(&[connection], ServerMessage::welcome(peer_id, connection))
                .await;
        }

        Ok(())
    }

    /// A socket closed (`Open → Closed`).
    ///
    /// Unregisters first, then leaves all rooms; each step is its own
    /// registry command. Nothing is sent on behalf of the closed socket.
    pub async fn on_disconnect(&self, connection: ConnectionId) {
        let record = match self.registry.unregister_connection(connection).await {
            Ok(record) => record,
            Err(e) => {
                warn!(connection = %connection, error = %e, "Failed to unregister connection");
                None
            }
        };

        let rooms = match self.registry.leave_all(connection).await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(
                    connection = %connection,
                    error = %e,
                    "Failed to evict connection from rooms"
                );
                Vec::new()
            }
        };

        match record {
            Some(record) => info!(
                peer_id = %record.peer_id,
                connection = %connection,
                rooms_left = rooms.len(),
                connected_secs = (Utc::now() - record.connected_at).num_seconds(),
                "Peer disconnected"
            ),
            None => debug!(connection = %connection, "Disconnect for unregistered connection"),
        }
    }

    /// An inbound frame arrived on `connection`.
    ///
    /// Never fails: every problem is logged and reported as
    /// [`RouteOutcome::Dropped`].
    pub async fn on_message(&self, connection: ConnectionId, raw: Bytes) -> RouteOutcome {
        let inbound = match parse_inbound(&raw) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(connection = %connection, error = %e, "Dropping malformed envelope");
                return RouteOutcome::Dropped(DropReason::Malformed);
            }
        };

        let sender = match self.registry.describe(connection).await {
            Ok(Some(sender)) => sender,
            Ok(None) => {
                debug!(connection = %connection, "Dropping frame from closed connection");
                return RouteOutcome::Dropped(DropReason::UnknownSender);
            }
            Err(e) => {
                warn!(connection = %connection, error = %e, "Registry unavailable");
                return RouteOutcome::Dropped(DropReason::RegistryUnavailable);
            }
        };

        if let Some(claimed) = inbound.claimed_from.as_ref() {
            if *claimed != sender.peer_id {
                debug!(
                    peer_id = %sender.peer_id,
                    claimed_from = %claimed,
                    "Envelope `from` differs from registered identity"
                );
            }
        }

        if let Some(custom) = inbound.custom {
            let listeners = self.listeners.dispatch(CustomEvent {
                name: custom.name,
                data: custom.data,
                from: sender.peer_id.clone(),
                connection,
            });
            debug!(peer_id = %sender.peer_id, listeners, "Dispatched custom event");
        }

        let result = match inbound.signal {
            Signal::JoinRoom { room_id } => self.handle_join(&sender, room_id).await,
            Signal::LeaveRoom { room_id } => self.handle_leave(&sender, room_id).await,
            Signal::Relay { target, .. } => self.handle_relay(&sender, target, raw).await,
        };

        result.unwrap_or_else(|e| {
            warn!(connection = %connection, error = %e, "Registry unavailable");
            RouteOutcome::Dropped(DropReason::RegistryUnavailable)
        })
    }

    /// Picks the room for a join/leave/broadcast per the configured source.
    fn resolve_room(&self, sender: &Connection, from_envelope: Option<RoomId>) -> Option<RoomId> {
        match self.config.room_source {
            RoomSource::Envelope => from_envelope,
            RoomSource::Attribute => {
                if from_envelope.is_some() {
                    debug!(
                        connection = %sender.id,
                        "Ignoring envelope room_id, rooms come from handshake attributes"
                    );
                }
                sender.attributes.room_id()
            }
        }
    }

    async fn handle_join(
        &self,
        sender: &Connection,
        room_id: Option<RoomId>,
    ) -> Result<RouteOutcome, RegistryError> {
        let Some(room_id) = self.resolve_room(sender, room_id) else {
            debug!(connection = %sender.id, "join-room without a room");
            return Ok(RouteOutcome::Dropped(DropReason::NoRoom));
        };

        let members = self.registry.join(room_id.clone(), sender.id).await?;

        info!(
            peer_id = %sender.peer_id,
            room_id = %room_id,
            members = members.len(),
            "Peer joined room"
        );

        if self.config.announce_joins {
            let notice = ServerMessage::peer_joined(room_id.clone(), sender.peer_id.clone());
            self.notify(&members, notice).await;
        }

        Ok(RouteOutcome::Joined {
            room_id,
            members: members.len(),
        })
    }

    async fn handle_leave(
        &self,
        sender: &Connection,
        room_id: Option<RoomId>,
    ) -> Result<RouteOutcome, RegistryError> {
        let Some(room_id) = self.resolve_room(sender, room_id) else {
            debug!(connection = %sender.id, "leave-room without a room");
            return Ok(RouteOutcome::Dropped(DropReason::NoRoom));
        };

        let was_member = self.registry.leave(room_id.clone(), sender.id).await?;

        debug!(
            peer_id = %sender.peer_id,
            room_id = %room_id,
            was_member,
            "Peer left room"
        );

        Ok(RouteOutcome::Left {
            room_id,
            was_member,
        })
    }

    async fn handle_relay(
        &self,
        sender: &Connection,
        target: Target,
        raw: Bytes,
    ) -> Result<RouteOutcome, RegistryError> {
        let room_id = match target {
            Target::Peer(to) => return self.relay_direct(sender, to, raw).await,
            Target::Room(room_id) => self.resolve_room(sender, Some(room_id)),
            Target::Unspecified => self.resolve_room(sender, None),
        };

        let Some(room_id) = room_id else {
            debug!(connection = %sender.id, "Relay envelope without recipient or room");
            return Ok(RouteOutcome::Dropped(DropReason::NoTarget));
        };

        let targets = self
            .registry
            .broadcast_targets(room_id.clone(), sender.id)
            .await?;
        let delivered = self.deliver(&targets, &raw).await;

        debug!(
            from = %sender.peer_id,
            room_id = %room_id,
            recipients = targets.len(),
            delivered,
            "Relayed message to room"
        );

        Ok(RouteOutcome::Broadcast {
            room_id,
            recipients: targets.len(),
            delivered,
        })
    }

    async fn relay_direct(
        &self,
        sender: &Connection,
        to: PeerId,
        raw: Bytes,
    ) -> Result<RouteOutcome, RegistryError> {
        let Some(recipient) = self.registry.resolve(to.clone()).await? else {
            debug!(from = %sender.peer_id, to = %to, "Direct recipient not registered");
            return Ok(RouteOutcome::Direct {
                to,
                recipient: None,
                delivered: false,
            });
        };

        let delivered = self.deliver(&[recipient], &raw).await == 1;

        debug!(from = %sender.peer_id, to = %to, delivered, "Relayed direct message");

        Ok(RouteOutcome::Direct {
            to,
            recipient: Some(recipient),
            delivered,
        })
    }

    /// Sends a relay notice to `targets`.
    async fn notify(&self, targets: &[ConnectionId], message: ServerMessage) {
        match message.to_json() {
            Ok(json) => {
                self.deliver(targets, &Bytes::from(json)).await;
            }
            Err(e) => warn!(error = %e, "Failed to encode relay notice"),
        }
    }

    /// Sends `payload` once to each target. Returns the number of
    /// successful sends; failures are logged and swallowed.
    async fn deliver(&self, targets: &[ConnectionId], payload: &Bytes) -> usize {
        let sends = targets.iter().map(|target| {
            let payload = payload.clone();
            async move { (*target, self.transport.send(*target, payload).await) }
        });

        join_all(sends)
            .await
            .into_iter()
            .filter(|(target, result)| match result {
                Ok(()) => true,
                Err(e) => {
                    debug!(connection = %target, error = %e, "Send failed");
                    false
                }
            })
            .count()
    }
}
