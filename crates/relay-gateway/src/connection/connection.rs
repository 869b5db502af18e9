//! Individual WebSocket connection
//!
//! Represents a single WebSocket connection, its outbound queue, and the
//! rooms it has joined on this process.

use crate::protocol::{EventFrame, ServerEvent};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Room membership of one connection
///
/// Guarded by a single lock so that join and disconnect for the same
/// connection never interleave.
#[derive(Debug, Default)]
pub(crate) struct Membership {
    pub(crate) rooms: HashSet<String>,
    pub(crate) closed: bool,
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique session ID
    session_id: String,

    /// Channel to send frames to the WebSocket
    sender: mpsc::Sender<EventFrame>,

    /// Rooms joined on this process
    membership: Mutex<Membership>,

    /// Last inbound traffic (frames, pings, pongs)
    last_activity: Mutex<Instant>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(session_id: String, sender: mpsc::Sender<EventFrame>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            sender,
            membership: Mutex::new(Membership::default()),
            last_activity: Mutex::new(Instant::now()),
            created_at: Instant::now(),
        })
    }

    /// Get the session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn membership(&self) -> &Mutex<Membership> {
        &self.membership
    }

    /// Rooms this connection has joined
    pub fn rooms(&self) -> Vec<String> {
        self.membership.lock().rooms.iter().cloned().collect()
    }

    /// Check if the connection is a member of a room
    pub fn is_in_room(&self, room: &str) -> bool {
        self.membership.lock().rooms.contains(room)
    }

    /// Whether the connection has been removed from the registry
    pub fn is_disconnected(&self) -> bool {
        self.membership.lock().closed
    }

    /// Record inbound traffic
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last inbound traffic
    pub fn idle_time(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Queue a frame without waiting
    ///
    /// Returns `false` if the queue is full or the socket is gone; the frame
    /// is dropped in both cases.
    pub fn try_send(&self, frame: EventFrame) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    event = %frame.event,
                    "Outbound queue full, dropping frame"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::trace!(session_id = %self.session_id, "Outbound queue closed");
                false
            }
        }
    }

    /// Queue a server event without waiting
    pub fn emit(&self, event: ServerEvent) -> bool {
        self.try_send(event.into_frame())
    }

    /// Check if the sender channel is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("rooms", &self.membership.lock().rooms.len())
            .field("created_at", &self.created_at)
            .finish()
    }
}
