//! In-memory broadcast medium for tests and local runs.
//!
//! Every clone shares the same bus, so several gateways in one process can
//! relay to each other exactly as they would through Redis. A bus built with
//! [`MemoryBroadcast::recording`] also keeps every payload it carries.

use crate::error::{BroadcastError, BroadcastResult};
use crate::topics::Topic;
use crate::traits::{BroadcastPublisher, BroadcastSubscriber, ReceivedMessage, Subscription};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

const DEFAULT_BUFFER: usize = 1024;

#[derive(Debug)]
struct Inner {
    /// `None` once shut down
    sender: Mutex<Option<broadcast::Sender<ReceivedMessage>>>,
    /// `None` unless recording
    published: Option<Mutex<Vec<ReceivedMessage>>>,
}

/// Shared in-memory pub/sub bus
#[derive(Debug, Clone)]
pub struct MemoryBroadcast {
    inner: Arc<Inner>,
}

impl Default for MemoryBroadcast {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl MemoryBroadcast {
    /// Creates a bus buffering up to `buffer_size` undelivered messages per receiver.
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        Self::build(buffer_size, false)
    }

    /// Creates a bus that keeps a log of every published payload.
    ///
    /// The log is never trimmed; use it for tests and short-lived runs.
    #[must_use]
    pub fn recording() -> Self {
        Self::build(DEFAULT_BUFFER, true)
    }

    fn build(buffer_size: usize, record: bool) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            inner: Arc::new(Inner {
                sender: Mutex::new(Some(sender)),
                published: record.then(|| Mutex::new(Vec::new())),
            }),
        }
    }

    /// Whether this bus keeps a log of published payloads.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.inner.published.is_some()
    }

    /// Everything published on the bus so far, oldest first.
    ///
    /// Always empty unless the bus is recording.
    #[must_use]
    pub fn published(&self) -> Vec<ReceivedMessage> {
        self.inner
            .published
            .as_ref()
            .map(|log| log.lock().clone())
            .unwrap_or_default()
    }

    /// Payloads published on one topic, oldest first.
    #[must_use]
    pub fn published_on(&self, topic: &Topic) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|msg| &msg.topic == topic)
            .map(|msg| msg.payload)
            .collect()
    }

    /// Whether the bus has been shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.sender.lock().is_none()
    }
}

#[async_trait]
impl BroadcastPublisher for MemoryBroadcast {
    async fn publish(&self, topic: &Topic, payload: &str) -> BroadcastResult<u32> {
        let sender = self
            .inner
            .sender
            .lock()
            .clone()
            .ok_or(BroadcastError::ChannelClosed)?;

        let msg = ReceivedMessage {
            topic: topic.clone(),
            payload: payload.to_string(),
        };
        if let Some(log) = &self.inner.published {
            log.lock().push(msg.clone());
        }

        // No receivers is not an error
        let receivers = sender.send(msg).unwrap_or(0);

        tracing::trace!(topic = %topic, receivers = receivers, "Published in memory");

        Ok(receivers as u32)
    }
}

#[async_trait]
impl BroadcastSubscriber for MemoryBroadcast {
    async fn subscribe(&self, topic: &Topic) -> BroadcastResult<Subscription> {
        let receiver = self
            .inner
            .sender
            .lock()
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(BroadcastError::ChannelClosed)?;

        Ok(Subscription::new(topic.clone(), receiver))
    }

    /// Closes the bus for every clone; open subscriptions end.
    async fn shutdown(&self) -> BroadcastResult<()> {
        self.inner.sender.lock().take();
        Ok(())
    }
}
