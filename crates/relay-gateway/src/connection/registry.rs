//! Connection registry
//!
//! Tracks every WebSocket connection on this process and the rooms each one
//! has joined, using DashMap for thread-safe access.

use super::Connection;
use crate::protocol::EventFrame;
use dashmap::DashMap;
use relay_core::RoomId;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Prefix of room group names
pub const ROOM_GROUP_PREFIX: &str = "room:";

/// Group name for a room (`"room:5"`)
pub fn room_group(room_id: RoomId) -> String {
    format!("{ROOM_GROUP_PREFIX}{room_id}")
}

/// Per-process registry of connections and room memberships
///
/// Membership is local to this process; other processes learn about
/// messages through the broadcast channel and deliver to their own
/// registries.
///
/// Other crates deliver to a single room on this process:
///
/// ```
/// use relay_gateway::protocol::EventFrame;
/// use relay_gateway::ConnectionRegistry;
///
/// let registry = ConnectionRegistry::new();
/// assert_eq!(registry.deliver("room:1", &EventFrame::new("notice", serde_json::Value::Null)), 0);
/// ```
///
/// Multi-room delivery goes through [`ClusterAdapter::broadcast`](crate::ClusterAdapter::broadcast),
/// which also reaches the other processes:
///
/// ```compile_fail
/// use relay_gateway::protocol::EventFrame;
/// use relay_gateway::ConnectionRegistry;
///
/// let registry = ConnectionRegistry::new();
/// registry.deliver_to(&[], &EventFrame::new("notice", serde_json::Value::Null), &[]);
/// ```
pub struct ConnectionRegistry {
    /// Active connections by session ID
    connections: DashMap<String, Arc<Connection>>,

    /// Room group name to session IDs mapping
    rooms: DashMap<String, HashSet<String>>,
}

impl ConnectionRegistry {
    /// Create a new registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    /// Create a new registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection
    pub fn add_connection(
        &self,
        session_id: String,
        sender: mpsc::Sender<EventFrame>,
    ) -> Arc<Connection> {
        let connection = Connection::new(session_id.clone(), sender);
        self.connections.insert(session_id.clone(), connection.clone());

        tracing::debug!(session_id = %session_id, "Connection added");

        connection
    }

    /// Remove a connection and every membership it holds
    ///
    /// Returns `false` if the session was not registered.
    pub fn remove_connection(&self, session_id: &str) -> bool {
        let Some((_, connection)) = self.connections.remove(session_id) else {
            return false;
        };

        let mut membership = connection.membership().lock();
        membership.closed = true;
        for room in membership.rooms.drain() {
            self.remove_member(&room, session_id);
        }
        drop(membership);

        tracing::debug!(session_id = %session_id, "Connection removed");

        true
    }

    /// Get a connection by session ID
    pub fn get_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| r.clone())
    }

    /// Add a connection to a room
    ///
    /// Idempotent. Returns `false` if the connection is unknown or already
    /// disconnected, in which case nothing is recorded.
    pub fn join(&self, room: &str, session_id: &str) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };

        let mut membership = connection.membership().lock();
        if membership.closed {
            return false;
        }

        if membership.rooms.insert(room.to_string()) {
            self.rooms
                .entry(room.to_string())
                .or_default()
                .insert(session_id.to_string());

            tracing::trace!(session_id = %session_id, room = %room, "Connection joined room");
        }

        true
    }

    /// Remove a connection from a room
    ///
    /// Returns `true` if the connection was a member.
    pub fn leave(&self, room: &str, session_id: &str) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };

        let mut membership = connection.membership().lock();
        let removed = membership.rooms.remove(room);
        if removed {
            self.remove_member(room, session_id);

            tracing::trace!(session_id = %session_id, room = %room, "Connection left room");
        }

        removed
    }

    /// Drop a session from a room's member set, removing the room when empty
    fn remove_member(&self, room: &str, session_id: &str) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(session_id);
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());
    }

    /// Get all connections that joined a room
    pub fn room_members(&self, room: &str) -> Vec<Arc<Connection>> {
        self.rooms
            .get(room)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Send a frame to every member of a room on this process
    ///
    /// Never waits on a slow connection; returns how many frames were queued.
    pub fn deliver(&self, room: &str, frame: &EventFrame) -> usize {
        let members = self.room_members(room);
        let mut sent = 0;

        for conn in members {
            if conn.try_send(frame.clone()) {
                sent += 1;
            }
        }

        tracing::trace!(room = %room, event = %frame.event, sent = sent, "Frame delivered to room");

        sent
    }

    /// Send a frame to the members of several rooms, each connection at most once
    ///
    /// An empty `rooms` list targets every connection. Sessions listed in
    /// `except` are skipped.
    pub(crate) fn deliver_to(&self, rooms: &[String], frame: &EventFrame, except: &[String]) -> usize {
        let targets: Vec<Arc<Connection>> = if rooms.is_empty() {
            self.connections.iter().map(|r| r.clone()).collect()
        } else {
            let mut seen = HashSet::new();
            rooms
                .iter()
                .flat_map(|room| self.room_members(room))
                .filter(|conn| seen.insert(conn.session_id().to_string()))
                .collect()
        };

        let mut sent = 0;
        for conn in targets {
            if except.iter().any(|sid| sid == conn.session_id()) {
                continue;
            }
            if conn.try_send(frame.clone()) {
                sent += 1;
            }
        }

        sent
    }

    /// Get the number of members of a room on this process
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }

    /// Get the total number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of rooms with at least one member
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Check if a session exists
    pub fn has_session(&self, session_id: &str) -> bool {
        self.connections.contains_key(session_id)
    }

    /// Drop every connection and membership
    ///
    /// Connections still holding an `Arc` see themselves as disconnected and
    /// can no longer join rooms.
    pub fn clear(&self) {
        for entry in &self.connections {
            let mut membership = entry.membership().lock();
            membership.closed = true;
            membership.rooms.clear();
        }
        self.connections.clear();
        self.rooms.clear();

        tracing::debug!("Connection registry cleared");
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.len())
            .field("rooms", &self.rooms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(event: &str) -> EventFrame {
        EventFrame::new(event, json!({}))
    }

    #[test]
    fn test_room_group() {
        assert_eq!(room_group(RoomId::new(5)), "room:5");
    }

    #[tokio::test]
    async fn test_add_remove_connection() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(10);

        let conn = registry.add_connection("session1".to_string(), tx);
        assert_eq!(conn.session_id(), "session1");
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.has_session("session1"));

        assert!(registry.remove_connection("session1"));
        assert_eq!(registry.connection_count(), 0);
        assert!(!registry.has_session("session1"));
        assert!(conn.is_disconnected());

        assert!(!registry.remove_connection("session1"));
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(10);
        registry.add_connection("s1".to_string(), tx);

        assert!(registry.join("room:5", "s1"));
        assert!(registry.join("room:5", "s1"));
        assert_eq!(registry.member_count("room:5"), 1);

        assert_eq!(registry.deliver("room:5", &frame("message")), 1);
        assert_eq!(rx.recv().await.unwrap().event, "message");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_only_to_room_members() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, mut rx2) = mpsc::channel(10);
        registry.add_connection("s1".to_string(), tx1);
        registry.add_connection("s2".to_string(), tx2);

        registry.join("room:5", "s1");
        registry.join("room:6", "s2");

        assert_eq!(registry.deliver("room:5", &frame("message")), 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());

        assert_eq!(registry.deliver("room:7", &frame("message")), 0);
    }

    #[tokio::test]
    async fn test_leave() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(10);
        let conn = registry.add_connection("s1".to_string(), tx);

        registry.join("room:5", "s1");
        assert!(conn.is_in_room("room:5"));

        assert!(registry.leave("room:5", "s1"));
        assert!(!conn.is_in_room("room:5"));
        assert_eq!(registry.member_count("room:5"), 0);
        assert_eq!(registry.room_count(), 0);

        assert!(!registry.leave("room:5", "s1"));
    }

    #[tokio::test]
    async fn test_disconnect_removes_all_memberships() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = mpsc::channel(10);
        let (tx2, _rx2) = mpsc::channel(10);
        registry.add_connection("s1".to_string(), tx1);
        registry.add_connection("s2".to_string(), tx2);

        registry.join("room:1", "s1");
        registry.join("room:2", "s1");
        registry.join("room:2", "s2");

        registry.remove_connection("s1");

        assert_eq!(registry.member_count("room:1"), 0);
        assert_eq!(registry.member_count("room:2"), 1);
        assert_eq!(registry.room_count(), 1);
    }

    #[tokio::test]
    async fn test_join_after_disconnect_is_rejected() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(10);
        registry.add_connection("s1".to_string(), tx);

        registry.remove_connection("s1");

        assert!(!registry.join("room:5", "s1"));
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_join_racing_disconnect_leaves_no_membership() {
        for _ in 0..50 {
            let registry = Arc::new(ConnectionRegistry::new());
            let (tx, _rx) = mpsc::channel(10);
            registry.add_connection("s1".to_string(), tx);

            let joiner = {
                let registry = registry.clone();
                tokio::spawn(async move {
                    for room in 0..20 {
                        registry.join(&format!("room:{room}"), "s1");
                    }
                })
            };
            let remover = {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.remove_connection("s1");
                })
            };

            joiner.await.unwrap();
            remover.await.unwrap();

            assert_eq!(registry.room_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_deliver_to_dedupes_and_skips_except() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, mut rx2) = mpsc::channel(10);
        let (tx3, mut rx3) = mpsc::channel(10);
        registry.add_connection("s1".to_string(), tx1);
        registry.add_connection("s2".to_string(), tx2);
        registry.add_connection("s3".to_string(), tx3);

        registry.join("room:1", "s1");
        registry.join("room:2", "s1");
        registry.join("room:2", "s2");

        let rooms = vec!["room:1".to_string(), "room:2".to_string()];
        let sent = registry.deliver_to(&rooms, &frame("notice"), &["s2".to_string()]);

        assert_eq!(sent, 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_to_all_when_no_rooms() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, mut rx2) = mpsc::channel(10);
        registry.add_connection("s1".to_string(), tx1);
        registry.add_connection("s2".to_string(), tx2);

        assert_eq!(registry.deliver_to(&[], &frame("notice"), &[]), 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(10);
        let conn = registry.add_connection("s1".to_string(), tx);
        registry.join("room:5", "s1");

        registry.clear();

        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.room_count(), 0);
        assert!(conn.is_disconnected());
        assert!(conn.rooms().is_empty());
    }
}
