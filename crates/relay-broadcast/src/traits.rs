//! Publish and subscribe capabilities.
//!
//! Publishing and subscribing are separate traits. A Redis deployment backs
//! them with two connections because a subscribed Redis connection cannot
//! issue other commands; the in-memory medium backs both with one bus.

use crate::error::BroadcastResult;
use crate::topics::Topic;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Message received from the medium
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Topic the message was received on
    pub topic: Topic,
    /// Raw payload
    pub payload: String,
}

impl ReceivedMessage {
    /// Create from a raw topic name and payload
    #[must_use]
    pub fn new(topic_name: &str, payload: String) -> Self {
        Self {
            topic: Topic::parse(topic_name),
            payload,
        }
    }
}

/// Capability to publish payloads on a topic
#[async_trait]
pub trait BroadcastPublisher: Send + Sync {
    /// Publish a payload, returning the number of receivers reported by the medium
    async fn publish(&self, topic: &Topic, payload: &str) -> BroadcastResult<u32>;
}

/// Capability to receive payloads published on a topic
#[async_trait]
pub trait BroadcastSubscriber: Send + Sync {
    /// Subscribe to a topic
    ///
    /// Returns once the medium has confirmed the subscription.
    async fn subscribe(&self, topic: &Topic) -> BroadcastResult<Subscription>;

    /// Stop receiving; open subscriptions end
    async fn shutdown(&self) -> BroadcastResult<()>;
}

/// Publisher shared by every handler in a process
pub type SharedPublisher = Arc<dyn BroadcastPublisher>;

/// Subscriber shared by every handler in a process
pub type SharedSubscriber = Arc<dyn BroadcastSubscriber>;

/// Serialize a value to JSON and publish it
pub async fn publish_json<T>(
    publisher: &dyn BroadcastPublisher,
    topic: &Topic,
    value: &T,
) -> BroadcastResult<u32>
where
    T: Serialize + Sync,
{
    let payload = serde_json::to_string(value)?;
    publisher.publish(topic, &payload).await
}

/// Stream of messages for a single topic
#[derive(Debug)]
pub struct Subscription {
    topic: Topic,
    receiver: broadcast::Receiver<ReceivedMessage>,
}

impl Subscription {
    /// Wrap a receiver, keeping only messages for `topic`
    #[must_use]
    pub fn new(topic: Topic, receiver: broadcast::Receiver<ReceivedMessage>) -> Self {
        Self { topic, receiver }
    }

    /// Topic this subscription listens on
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Wait for the next message on this topic
    ///
    /// Returns `None` once the medium has shut down. Lagging behind the
    /// medium skips messages rather than failing.
    pub async fn recv(&mut self) -> Option<ReceivedMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if msg.topic == self.topic => return Some(msg),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        topic = %self.topic,
                        skipped = skipped,
                        "Subscription lagged behind, messages dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
