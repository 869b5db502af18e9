//! Cluster adapter
//!
//! Replicates transport-level broadcasts (an event sent to a set of rooms)
//! across processes. Packets travel on the adapter topic, never on
//! `chat_messages`, so chat envelopes and adapter packets cannot be
//! delivered twice by mixing the two paths.

use crate::connection::ConnectionRegistry;
use crate::gateway::GatewayResult;
use crate::protocol::EventFrame;
use parking_lot::Mutex;
use relay_broadcast::{publish_json, SharedPublisher, SharedSubscriber, Subscription, Topic};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Default namespace
pub const DEFAULT_NAMESPACE: &str = "/";

/// Packet published on the adapter topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterPacket {
    /// Adapter that published the packet
    pub uid: String,
    /// Target room groups; empty means every connection
    #[serde(default)]
    pub rooms: Vec<String>,
    /// Session ids to skip
    #[serde(default)]
    pub except: Vec<String>,
    pub event: EventFrame,
}

/// Cross-process room broadcaster
pub struct ClusterAdapter {
    uid: String,
    topic: Topic,
    registry: Arc<ConnectionRegistry>,
    publisher: SharedPublisher,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ClusterAdapter {
    /// Subscribe to the adapter topic and start delivering remote packets
    pub async fn start(
        uid: impl Into<String>,
        registry: Arc<ConnectionRegistry>,
        publisher: SharedPublisher,
        subscriber: &SharedSubscriber,
    ) -> GatewayResult<Arc<Self>> {
        let topic = Topic::adapter(DEFAULT_NAMESPACE);
        let subscription = subscriber.subscribe(&topic).await?;

        let adapter = Arc::new(Self {
            uid: uid.into(),
            topic,
            registry,
            publisher,
            listener: Mutex::new(None),
        });

        let handle = tokio::spawn(run_listener(
            adapter.uid.clone(),
            adapter.registry.clone(),
            subscription,
        ));
        *adapter.listener.lock() = Some(handle);

        tracing::info!(uid = %adapter.uid, topic = %adapter.topic, "Cluster adapter started");

        Ok(adapter)
    }

    /// Adapter id carried on published packets
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Send an event to the given rooms on every process
    ///
    /// Local members are served directly; other processes receive the packet
    /// and serve theirs. Returns the number of local deliveries.
    pub async fn broadcast(
        &self,
        rooms: &[String],
        event: EventFrame,
        except: &[String],
    ) -> GatewayResult<usize> {
        let sent = self.registry.deliver_to(rooms, &event, except);

        let packet = AdapterPacket {
            uid: self.uid.clone(),
            rooms: rooms.to_vec(),
            except: except.to_vec(),
            event,
        };
        publish_json(self.publisher.as_ref(), &self.topic, &packet).await?;

        tracing::debug!(
            uid = %self.uid,
            rooms = ?packet.rooms,
            event = %packet.event.event,
            local = sent,
            "Adapter broadcast published"
        );

        Ok(sent)
    }

    /// Deliver one adapter packet received from the medium
    pub fn on_packet(&self, payload: &str) -> usize {
        deliver_packet(&self.uid, &self.registry, payload)
    }

    /// Stop delivering remote packets
    pub fn stop(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ClusterAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterAdapter")
            .field("uid", &self.uid)
            .field("topic", &self.topic)
            .finish()
    }
}

async fn run_listener(
    uid: String,
    registry: Arc<ConnectionRegistry>,
    mut subscription: Subscription,
) {
    while let Some(msg) = subscription.recv().await {
        deliver_packet(&uid, &registry, &msg.payload);
    }

    tracing::info!(uid = %uid, "Adapter listener ended");
}

fn deliver_packet(uid: &str, registry: &ConnectionRegistry, payload: &str) -> usize {
    let packet: AdapterPacket = match serde_json::from_str(payload) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed adapter packet");
            return 0;
        }
    };

    // Already delivered locally when it was published
    if packet.uid == uid {
        return 0;
    }

    registry.deliver_to(&packet.rooms, &packet.event, &packet.except)
}
