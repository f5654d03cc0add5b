//! Room membership table.
//!
//! Owned exclusively by the [`RegistryActor`](super::RegistryActor).
//! Members are transport handles, kept in a `BTreeSet` so a handle appears
//! at most once per room and iteration order is stable.

use std::collections::{BTreeSet, HashMap};

use relay_core::{ConnectionId, RoomId};
use serde::{Deserialize, Serialize};

/// What happens to a room once its last member leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyRoomPolicy {
    /// Drop the room, keeping memory bounded by live membership
    #[default]
    Evict,
    /// Keep empty rooms for the life of the process
    Retain,
}

/// Room id → member handles.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomId, BTreeSet<ConnectionId>>,
    policy: EmptyRoomPolicy,
}

impl RoomTable {
    pub fn new(policy: EmptyRoomPolicy) -> Self {
        Self {
            rooms: HashMap::new(),
            policy,
        }
    }

    /// Adds `connection` to `room`, creating the room if needed.
    ///
    /// Idempotent. Returns the room's members after the join.
    pub fn join(&mut self, room: RoomId, connection: ConnectionId) -> Vec<ConnectionId> {
        let members = self.rooms.entry(room).or_default();
        members.insert(connection);
        members.iter().copied().collect()
    }

    /// Removes `connection` from `room`. Returns whether it was a member.
    pub fn leave(&mut self, room: &RoomId, connection: ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };

        let removed = members.remove(&connection);
        if members.is_empty() && self.policy == EmptyRoomPolicy::Evict {
            self.rooms.remove(room);
        }
        removed
    }

    /// Removes `connection` from every room. Returns the rooms it left.
    pub fn leave_all(&mut self, connection: ConnectionId) -> Vec<RoomId> {
        let mut left = Vec::new();

        for (room, members) in self.rooms.iter_mut() {
            if members.remove(&connection) {
                left.push(room.clone());
            }
        }

        if self.policy == EmptyRoomPolicy::Evict {
            self.rooms.retain(|_, members| !members.is_empty());
        }

        left.sort();
        left
    }

    /// Members of `room`. An unknown room has no members.
    pub fn members(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Members of `room` other than `sender`.
    pub fn members_except(&self, room: &RoomId, sender: ConnectionId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .filter(|member| *member != sender)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rooms `connection` currently belongs to.
    pub fn rooms_of(&self, connection: ConnectionId) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, members)| members.contains(&connection))
            .map(|(room, _)| room.clone())
            .collect();
        rooms.sort();
        rooms
    }

    /// Number of rooms in the table (empty ones included under `Retain`).
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn policy(&self) -> EmptyRoomPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(n: u64) -> ConnectionId {
        ConnectionId::new(n)
    }

    fn room(name: &str) -> RoomId {
        RoomId::new(name)
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut table = RoomTable::new(EmptyRoomPolicy::Evict);
        table.join(room("r1"), conn(1));
        table.join(room("r1"), conn(1));
        let members = table.join(room("r1"), conn(1));

        assert_eq!(members, vec![conn(1)]);
        assert_eq!(table.members(&room("r1")), vec![conn(1)]);
    }

    #[test]
    fn test_join_returns_all_members() {
        let mut table = RoomTable::default();
        table.join(room("r1"), conn(2));
        let members = table.join(room("r1"), conn(1));
        assert_eq!(members, vec![conn(1), conn(2)]);
    }

    #[test]
    fn test_leave_absent_is_noop() {
        let mut table = RoomTable::default();
        assert!(!table.leave(&room("nope"), conn(1)));

        table.join(room("r1"), conn(1));
        assert!(!table.leave(&room("r1"), conn(2)));
        assert_eq!(table.members(&room("r1")), vec![conn(1)]);
    }

    #[test]
    fn test_leave_evicts_empty_room() {
        let mut table = RoomTable::new(EmptyRoomPolicy::Evict);
        table.join(room("r1"), conn(1));
        assert!(table.leave(&room("r1"), conn(1)));
        assert_eq!(table.room_count(), 0);
    }

    #[test]
    fn test_leave_retains_empty_room() {
        let mut table = RoomTable::new(EmptyRoomPolicy::Retain);
        table.join(room("r1"), conn(1));
        assert!(table.leave(&room("r1"), conn(1)));
        assert_eq!(table.room_count(), 1);
        assert!(table.members(&room("r1")).is_empty());
    }

    #[test]
    fn test_leave_all_removes_everywhere() {
        let mut table = RoomTable::new(EmptyRoomPolicy::Evict);
        table.join(room("r1"), conn(1));
        table.join(room("r2"), conn(1));
        table.join(room("r2"), conn(2));
        table.join(room("r3"), conn(2));

        let left = table.leave_all(conn(1));
        assert_eq!(left, vec![room("r1"), room("r2")]);
        assert!(table.rooms_of(conn(1)).is_empty());
        assert_eq!(table.members(&room("r2")), vec![conn(2)]);
        // r1 became empty and was evicted
        assert_eq!(table.room_count(), 2);
    }

    #[test]
    fn test_members_except_excludes_sender() {
        let mut table = RoomTable::default();
        for n in 1..=3 {
            table.join(room("r1"), conn(n));
        }
        assert_eq!(table.members_except(&room("r1"), conn(1)), vec![conn(2), conn(3)]);
        assert!(table.members_except(&room("unknown"), conn(1)).is_empty());
    }
}
