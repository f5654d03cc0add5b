//! Integration tests for the Registry Actor.
//!
//! These tests verify the registry works correctly as a complete system,
//! testing the spawn_registry() function and RegistryHandle interface.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::time::Duration;

use relay_core::{Attributes, ConnectionId, PeerId, RoomId, ROOM_ID_ATTRIBUTE};
use relayd::registry::{
    spawn_registry, spawn_registry_with_buffer, EmptyRoomPolicy, RegistryError, RegistryHandle,
    RegistryStats,
};
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Test Helpers
// ============================================================================

fn conn(n: u64) -> ConnectionId {
    ConnectionId::new(n)
}

fn room(name: &str) -> RoomId {
    RoomId::new(name)
}

async fn register(handle: &RegistryHandle, peer: &str, n: u64) -> ConnectionId {
    handle
        .register(PeerId::new(peer), conn(n), Attributes::new())
        .await
        .expect("registration should succeed");
    conn(n)
}

// ============================================================================
// Basic Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_basic_lifecycle() {
    let handle = spawn_registry(EmptyRoomPolicy::Evict);

    let a = register(&handle, "alice", 1).await;
    assert_eq!(handle.resolve(PeerId::new("alice")).await.unwrap(), Some(a));

    let record = handle.describe(a).await.unwrap().expect("record should exist");
    assert_eq!(record.peer_id, PeerId::new("alice"));
    assert_eq!(record.attributes.get("user_id"), Some("alice"));

    let removed = handle.unregister_connection(a).await.unwrap();
    assert_eq!(removed.map(|r| r.id), Some(a));
    assert_eq!(handle.resolve(PeerId::new("alice")).await.unwrap(), None);
    assert!(handle.describe(a).await.unwrap().is_none());

    assert!(handle.is_connected());
}

#[tokio::test]
async fn test_attributes_are_kept() {
    let handle = spawn_registry(EmptyRoomPolicy::Evict);
    let attrs = Attributes::new().with(ROOM_ID_ATTRIBUTE, "lobby");

    handle
        .register(PeerId::new("alice"), conn(1), attrs)
        .await
        .unwrap();

    let record = handle.describe(conn(1)).await.unwrap().unwrap();
    assert_eq!(record.attributes.room_id(), Some(room("lobby")));
}

#[tokio::test]
async fn test_reregister_supersedes() {
    let handle = spawn_registry(EmptyRoomPolicy::Evict);
    register(&handle, "alice", 1).await;

    let superseded = handle
        .register(PeerId::new("alice"), conn(2), Attributes::new())
        .await
        .unwrap();
    assert_eq!(superseded, Some(conn(1)));
    assert_eq!(handle.resolve(PeerId::new("alice")).await.unwrap(), Some(conn(2)));

    // Same handle again is not a supersede
    let superseded = handle
        .register(PeerId::new("alice"), conn(2), Attributes::new())
        .await
        .unwrap();
    assert_eq!(superseded, None);

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.connections, 2);
    assert_eq!(stats.peers, 1);
}

#[tokio::test]
async fn test_unregister_missing_is_noop() {
    let handle = spawn_registry(EmptyRoomPolicy::Evict);

    assert_eq!(handle.unregister(PeerId::new("ghost")).await.unwrap(), None);
    assert!(handle.unregister_connection(conn(9)).await.unwrap().is_none());
    assert_eq!(handle.stats().await.unwrap(), RegistryStats::default());
}

// ============================================================================
// Room Tests
// ============================================================================

#[tokio::test]
async fn test_join_returns_members() {
    let handle = spawn_registry(EmptyRoomPolicy::Evict);
    let a = register(&handle, "alice", 1).await;
    let b = register(&handle, "bob", 2).await;

    assert_eq!(handle.join(room("r1"), a).await.unwrap(), vec![a]);
    assert_eq!(handle.join(room("r1"), b).await.unwrap(), vec![a, b]);
    assert_eq!(handle.join(room("r1"), a).await.unwrap(), vec![a, b]);

    assert_eq!(handle.members(room("r1")).await.unwrap(), vec![a, b]);
    assert_eq!(handle.broadcast_targets(room("r1"), a).await.unwrap(), vec![b]);
}

#[tokio::test]
async fn test_leave_all_clears_every_room() {
    let handle = spawn_registry(EmptyRoomPolicy::Evict);
    let a = register(&handle, "alice", 1).await;
    let b = register(&handle, "bob", 2).await;

    for name in ["r2", "r1"] {
        handle.join(room(name), a).await.unwrap();
    }
    handle.join(room("r1"), b).await.unwrap();

    let left = handle.leave_all(a).await.unwrap();
    assert_eq!(left, vec![room("r1"), room("r2")]);
    assert!(handle.rooms_of(a).await.unwrap().is_empty());

    // r2 emptied and was evicted, r1 still has bob
    assert_eq!(handle.stats().await.unwrap().rooms, 1);
    assert_eq!(handle.members(room("r1")).await.unwrap(), vec![b]);
}

#[tokio::test]
async fn test_retain_policy_keeps_empty_rooms() {
    let handle = spawn_registry(EmptyRoomPolicy::Retain);
    let a = register(&handle, "alice", 1).await;

    handle.join(room("r1"), a).await.unwrap();
    assert!(handle.leave(room("r1"), a).await.unwrap());
    assert!(!handle.leave(room("r1"), a).await.unwrap());

    assert_eq!(handle.stats().await.unwrap().rooms, 1);
    assert!(handle.members(room("r1")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_room_is_empty() {
    let handle = spawn_registry(EmptyRoomPolicy::Evict);

    assert!(handle.members(room("nowhere")).await.unwrap().is_empty());
    assert!(handle
        .broadcast_targets(room("nowhere"), conn(1))
        .await
        .unwrap()
        .is_empty());
    assert!(!handle.leave(room("nowhere"), conn(1)).await.unwrap());
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_joins_keep_membership_unique() {
    let handle = spawn_registry_with_buffer(EmptyRoomPolicy::Evict, 4);

    let mut tasks = Vec::new();
    for n in 0..20u64 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .register(PeerId::new(format!("peer-{n}")), conn(n), Attributes::new())
                .await
                .unwrap();
            for _ in 0..5 {
                handle.join(room("r1"), conn(n)).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let members = handle.members(room("r1")).await.unwrap();
    assert_eq!(members.len(), 20);
    assert_eq!(members, (0..20).map(conn).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_concurrent_disconnects_leave_nothing_behind() {
    let handle = spawn_registry(EmptyRoomPolicy::Evict);

    for n in 0..10u64 {
        register(&handle, &format!("peer-{n}"), n).await;
        handle.join(room("r1"), conn(n)).await.unwrap();
        handle.join(room(&format!("solo-{n}")), conn(n)).await.unwrap();
    }

    let mut tasks = Vec::new();
    for n in 0..10u64 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle.unregister_connection(conn(n)).await.unwrap();
            handle.leave_all(conn(n)).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(handle.stats().await.unwrap(), RegistryStats::default());
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_closed_channel_reports_error() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let handle = RegistryHandle::new(tx);

    assert!(!handle.is_connected());

    let result = timeout(Duration::from_secs(1), handle.stats())
        .await
        .expect("closed channel should fail fast");
    assert_eq!(result, Err(RegistryError::ChannelClosed));

    let result = handle
        .register(PeerId::new("alice"), conn(1), Attributes::new())
        .await;
    assert_eq!(result, Err(RegistryError::ChannelClosed));
}
