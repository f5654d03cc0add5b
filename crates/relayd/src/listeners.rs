//! Local listeners for named custom events.
//!
//! When an envelope carries an `event` name, the router hands a
//! [`CustomEvent`] to the [`ListenerTable`] in addition to relaying the
//! payload. Listeners subscribe by name and receive events over a tokio
//! broadcast channel; dispatch never blocks and never affects delivery.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use relay_core::{ConnectionId, PeerId};

/// Per-name listener buffer
const LISTENER_BUFFER: usize = 64;

/// A named event observed in relayed traffic.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    /// Event name from the envelope
    pub name: String,

    /// Auxiliary payload from the envelope
    pub data: Option<serde_json::Value>,

    /// Logical id of the sending connection
    pub from: PeerId,

    /// Transport handle of the sending connection
    pub connection: ConnectionId,
}

/// Registered-listener table keyed by event name.
#[derive(Clone, Default)]
pub struct ListenerTable {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<CustomEvent>>>>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events named `name`.
    pub fn subscribe(&self, name: impl Into<String>) -> broadcast::Receiver<CustomEvent> {
        let name = name.into();
        let mut channels = match self.channels.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        channels
            .entry(name)
            .or_insert_with(|| broadcast::channel(LISTENER_BUFFER).0)
            .subscribe()
    }

    /// Hand `event` to the listeners of its name.
    ///
    /// Returns how many listeners received it. Zero listeners is not an
    /// error; channels whose listeners have all gone away are pruned.
    pub fn dispatch(&self, event: CustomEvent) -> usize {
        let name = event.name.clone();

        let result = {
            let channels = match self.channels.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match channels.get(&name) {
                Some(tx) => tx.send(event),
                None => {
                    debug!(event = %name, "No listeners for custom event");
                    return 0;
                }
            }
        };

        match result {
            Ok(received) => received,
            Err(_) => {
                // Every receiver was dropped
                let mut channels = match self.channels.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => {
                        warn!("Listener table lock was poisoned");
                        poisoned.into_inner()
                    }
                };
                if channels
                    .get(&name)
                    .is_some_and(|tx| tx.receiver_count() == 0)
                {
                    channels.remove(&name);
                }
                0
            }
        }
    }

    /// Number of live listeners for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        let channels = match self.channels.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        channels
            .get(name)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }
}
