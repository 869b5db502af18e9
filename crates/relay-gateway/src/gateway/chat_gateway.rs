//! Chat gateway
//!
//! Bridges client events to the store and the broadcast channel. A `send`
//! only publishes; every process, the origin included, delivers the message
//! to its local room members from its own subscriber loop.

use super::{BroadcastMedium, GatewayError, GatewayResult};
use crate::connection::{room_group, Connection, ConnectionRegistry};
use crate::envelope::MessageEnvelope;
use crate::protocol::{
    JoinPayload, MessagePayload, PayloadError, ServerEvent, JOIN_EVENT, MESSAGE_EVENT,
};
use parking_lot::Mutex;
use relay_broadcast::{publish_json, SharedPublisher, SharedSubscriber, Subscription, Topic};
use relay_common::{ErrorPolicy, RelayConfig};
use relay_core::SharedChatStore;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Per-process chat gateway
pub struct ChatGateway {
    store: SharedChatStore,
    publisher: SharedPublisher,
    subscriber: SharedSubscriber,
    registry: Arc<ConnectionRegistry>,
    /// Stamped on every envelope this process publishes
    origin: String,
    error_policy: ErrorPolicy,
    /// Subscriber loop for `chat_messages`
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ChatGateway {
    /// Connect to the broadcast medium, subscribe to `chat_messages`, and
    /// start the subscriber loop
    ///
    /// Fails if the medium cannot be reached; the caller must not start
    /// accepting connections in that case.
    pub async fn initialize(
        store: SharedChatStore,
        medium: &BroadcastMedium,
        registry: Arc<ConnectionRegistry>,
        config: &RelayConfig,
    ) -> GatewayResult<Arc<Self>> {
        let (publisher, subscriber) = medium.connect().await?;
        Self::with_handles(store, publisher, subscriber, registry, config).await
    }

    /// Same as [`ChatGateway::initialize`] over already-open handles
    pub async fn with_handles(
        store: SharedChatStore,
        publisher: SharedPublisher,
        subscriber: SharedSubscriber,
        registry: Arc<ConnectionRegistry>,
        config: &RelayConfig,
    ) -> GatewayResult<Arc<Self>> {
        let subscription = subscriber.subscribe(&Topic::ChatMessages).await?;

        let gateway = Arc::new(Self {
            store,
            publisher,
            subscriber,
            registry,
            origin: config.instance_id.clone(),
            error_policy: config.error_policy,
            listener: Mutex::new(None),
        });

        let handle = tokio::spawn(run_subscriber(gateway.registry.clone(), subscription));
        *gateway.listener.lock() = Some(handle);

        tracing::info!(
            origin = %gateway.origin,
            error_policy = ?gateway.error_policy,
            "Chat gateway initialized"
        );

        Ok(gateway)
    }

    /// Get the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the publisher handle
    pub fn publisher(&self) -> &SharedPublisher {
        &self.publisher
    }

    /// Get the subscriber handle
    pub fn subscriber(&self) -> &SharedSubscriber {
        &self.subscriber
    }

    /// Origin id stamped on published envelopes
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Handle an inbound `join`
    ///
    /// On success the connection becomes a member of `room:<id>` and receives
    /// one `room` event. Failures are logged and handled by the error policy.
    pub async fn handle_join(&self, connection: &Connection, payload: JoinPayload) {
        if let Err(e) = self.try_join(connection, payload).await {
            self.report_failure(connection, JOIN_EVENT, &e);
        }
    }

    async fn try_join(&self, connection: &Connection, payload: JoinPayload) -> GatewayResult<()> {
        let room = self.store.get_room(payload.room_id).await?;
        let group = room_group(payload.room_id);

        if !self.registry.join(&group, connection.session_id()) {
            tracing::debug!(
                session_id = %connection.session_id(),
                room = %group,
                "Connection closed before join completed"
            );
            return Ok(());
        }

        connection.emit(ServerEvent::Room(room));

        tracing::info!(
            session_id = %connection.session_id(),
            room = %group,
            "Connection joined room"
        );

        Ok(())
    }

    /// Handle an inbound `message`
    ///
    /// Persists the message, converts it, and publishes exactly one envelope
    /// on `chat_messages`. Nothing is emitted locally here.
    pub async fn send(&self, connection: &Connection, payload: MessagePayload) {
        if let Err(e) = self.publish_chat(&payload).await {
            self.report_failure(connection, MESSAGE_EVENT, &e);
        }
    }

    async fn publish_chat(&self, payload: &MessagePayload) -> GatewayResult<()> {
        let record = self
            .store
            .create_chat(payload.user_id, payload.room_id, &payload.message)
            .await?;
        let chat = self.store.convert_chat_model(&record).await?;

        let envelope = MessageEnvelope::new(payload.room_id, chat, self.origin.as_str());
        let receivers =
            publish_json(self.publisher.as_ref(), &Topic::ChatMessages, &envelope).await?;

        tracing::debug!(
            message_id = %record.id,
            room_id = %payload.room_id,
            receivers = receivers,
            "Chat message published"
        );

        Ok(())
    }

    /// Handle a known event whose payload could not be decoded
    pub fn reject(&self, connection: &Connection, error: PayloadError) {
        let event = error.event.clone();
        self.report_failure(connection, &event, &GatewayError::from(error));
    }

    /// Deliver one `chat_messages` payload to local room members
    ///
    /// Malformed payloads are logged and dropped. Returns how many
    /// connections the message was queued for.
    pub fn on_channel_message(&self, payload: &str) -> usize {
        deliver_envelope(&self.registry, payload)
    }

    fn report_failure(&self, connection: &Connection, event: &str, error: &GatewayError) {
        tracing::warn!(
            session_id = %connection.session_id(),
            event = %event,
            code = error.code(),
            error = %error,
            "Client request failed"
        );

        if self.error_policy == ErrorPolicy::Emit {
            connection.emit(ServerEvent::error(event, error.code(), error.to_string()));
        }
    }

    /// Stop the subscriber loop and release the subscriber handle
    pub async fn shutdown(&self) {
        if let Err(e) = self.subscriber.shutdown().await {
            tracing::warn!(error = %e, "Failed to shut down subscriber");
        }

        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }

        tracing::info!(origin = %self.origin, "Chat gateway stopped");
    }
}

impl std::fmt::Debug for ChatGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatGateway")
            .field("origin", &self.origin)
            .field("error_policy", &self.error_policy)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Subscriber loop for `chat_messages`
async fn run_subscriber(registry: Arc<ConnectionRegistry>, mut subscription: Subscription) {
    tracing::debug!(topic = %subscription.topic(), "Chat subscriber loop started");

    while let Some(msg) = subscription.recv().await {
        deliver_envelope(&registry, &msg.payload);
    }

    tracing::info!("Chat subscriber loop ended");
}

fn deliver_envelope(registry: &ConnectionRegistry, payload: &str) -> usize {
    let envelope = match MessageEnvelope::from_json(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed chat_messages payload");
            return 0;
        }
    };

    let group = room_group(envelope.room_id);
    let frame = ServerEvent::Message(envelope.chat_model).into_frame();
    let sent = registry.deliver(&group, &frame);

    tracing::debug!(
        room = %group,
        origin = %envelope.source_origin,
        sent = sent,
        "Chat message delivered"
    );

    sent
}
