//! Redis subscriber.
//!
//! Owns a dedicated pub/sub connection, fans received payloads out to local
//! subscriptions, and reconnects (re-subscribing every topic) when the
//! connection drops after startup.

use crate::error::{BroadcastError, BroadcastResult};
use crate::pool::connection_info;
use crate::topics::Topic;
use crate::traits::{BroadcastSubscriber, ReceivedMessage, Subscription};
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::PubSub;
use redis::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Password applied on top of the URL
    pub password: Option<String>,
    /// Channel buffer size for local fan-out
    pub broadcast_buffer: usize,
    /// How long to wait when opening the pub/sub connection
    pub connect_timeout_ms: u64,
    /// Delay before reconnecting after the connection is lost
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            password: None,
            broadcast_buffer: 1024,
            connect_timeout_ms: 60_000,
            reconnect_delay_ms: 1000,
        }
    }
}

impl From<&relay_common::RedisConfig> for SubscriberConfig {
    fn from(config: &relay_common::RedisConfig) -> Self {
        Self {
            redis_url: config.url.clone(),
            password: config.password.clone(),
            connect_timeout_ms: config.connect_timeout_ms,
            reconnect_delay_ms: config.reconnect_delay_ms,
            ..Default::default()
        }
    }
}

/// Commands for subscription management
#[derive(Debug)]
enum SubscriberCommand {
    Subscribe(String, oneshot::Sender<BroadcastResult<()>>),
    Shutdown,
}

/// Redis pub/sub subscriber
pub struct RedisSubscriber {
    /// Currently subscribed topic names
    subscribed: Arc<RwLock<HashSet<String>>>,
    /// Local fan-out of received messages
    broadcast_tx: broadcast::Sender<ReceivedMessage>,
    /// Control channel for subscription management
    control_tx: mpsc::Sender<SubscriberCommand>,
}

impl RedisSubscriber {
    /// Open the dedicated pub/sub connection and start the background listener
    ///
    /// Fails if the first connection cannot be established within the
    /// connect timeout. Later connection losses are retried in the background.
    pub async fn connect(config: SubscriberConfig) -> BroadcastResult<Self> {
        let info = connection_info(&config.redis_url, config.password.as_deref())?;
        let client = Client::open(info)?;
        let pubsub = open_pubsub(&client, config.connect_timeout_ms).await?;

        tracing::info!("Subscriber connected to Redis");

        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer);
        let (control_tx, control_rx) = mpsc::channel(32);
        let subscribed = Arc::new(RwLock::new(HashSet::new()));

        tokio::spawn(Self::listener_loop(
            client,
            pubsub,
            config,
            subscribed.clone(),
            broadcast_tx.clone(),
            control_rx,
        ));

        Ok(Self {
            subscribed,
            broadcast_tx,
            control_tx,
        })
    }

    /// Background listener loop
    async fn listener_loop(
        client: Client,
        initial: PubSub,
        config: SubscriberConfig,
        subscribed: Arc<RwLock<HashSet<String>>>,
        broadcast_tx: broadcast::Sender<ReceivedMessage>,
        mut control_rx: mpsc::Receiver<SubscriberCommand>,
    ) {
        let reconnect_delay = Duration::from_millis(config.reconnect_delay_ms);
        let mut connection = Some(initial);

        loop {
            let pubsub = match connection.take() {
                Some(pubsub) => pubsub,
                None => match open_pubsub(&client, config.connect_timeout_ms).await {
                    Ok(pubsub) => {
                        tracing::info!("Subscriber reconnected to Redis");
                        pubsub
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Subscriber reconnect failed, retrying...");
                        tokio::time::sleep(reconnect_delay).await;
                        continue;
                    }
                },
            };

            match Self::run_listener(pubsub, &subscribed, &broadcast_tx, &mut control_rx).await {
                Ok(true) => {
                    tracing::info!("Subscriber shutting down");
                    break;
                }
                Ok(false) => {
                    tracing::warn!("Pub/Sub stream ended, reconnecting...");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Subscriber error, reconnecting...");
                }
            }

            tokio::time::sleep(reconnect_delay).await;
        }
    }

    /// Run the listener until error or shutdown
    ///
    /// Returns `Ok(true)` on shutdown and `Ok(false)` when the stream ends.
    async fn run_listener(
        mut pubsub: PubSub,
        subscribed: &Arc<RwLock<HashSet<String>>>,
        broadcast_tx: &broadcast::Sender<ReceivedMessage>,
        control_rx: &mut mpsc::Receiver<SubscriberCommand>,
    ) -> BroadcastResult<bool> {
        // Re-subscribe after a reconnect
        let topics: Vec<String> = subscribed.read().await.iter().cloned().collect();
        for topic in &topics {
            pubsub.subscribe(topic).await?;
        }

        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(msg) => {
                            let topic_name = msg.get_channel_name().to_string();
                            let payload: String = msg.get_payload().unwrap_or_default();

                            tracing::trace!(topic = %topic_name, "Received Pub/Sub message");

                            // No local subscriptions is not an error
                            let _ = broadcast_tx.send(ReceivedMessage::new(&topic_name, payload));
                        }
                        None => return Ok(false),
                    }
                }

                cmd = control_rx.recv() => {
                    match cmd {
                        Some(SubscriberCommand::Subscribe(topic, ack)) => {
                            // Need to drop stream to access pubsub
                            drop(stream);
                            let result = pubsub.subscribe(&topic).await;
                            stream = pubsub.on_message();

                            match result {
                                Ok(()) => {
                                    subscribed.write().await.insert(topic.clone());
                                    tracing::debug!(topic = %topic, "Subscribed to topic");
                                    let _ = ack.send(Ok(()));
                                }
                                Err(e) => {
                                    tracing::error!(topic = %topic, error = %e, "Failed to subscribe");
                                    let _ = ack.send(Err(e.into()));
                                }
                            }
                        }
                        Some(SubscriberCommand::Shutdown) | None => return Ok(true),
                    }
                }
            }
        }
    }

    /// Get currently subscribed topic names
    pub async fn subscribed_topics(&self) -> Vec<String> {
        self.subscribed.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl BroadcastSubscriber for RedisSubscriber {
    async fn subscribe(&self, topic: &Topic) -> BroadcastResult<Subscription> {
        // Receiver first, so nothing published after the ack is missed
        let receiver = self.broadcast_tx.subscribe();
        let (ack_tx, ack_rx) = oneshot::channel();

        self.control_tx
            .send(SubscriberCommand::Subscribe(topic.name(), ack_tx))
            .await
            .map_err(|_| BroadcastError::ChannelClosed)?;

        ack_rx.await.map_err(|_| BroadcastError::ChannelClosed)??;

        Ok(Subscription::new(topic.clone(), receiver))
    }

    async fn shutdown(&self) -> BroadcastResult<()> {
        self.control_tx
            .send(SubscriberCommand::Shutdown)
            .await
            .map_err(|_| BroadcastError::ChannelClosed)
    }
}

impl std::fmt::Debug for RedisSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSubscriber")
            .field("receivers", &self.broadcast_tx.receiver_count())
            .finish()
    }
}

/// Open a pub/sub connection, bounded by the connect timeout
async fn open_pubsub(client: &Client, timeout_ms: u64) -> BroadcastResult<PubSub> {
    tokio::time::timeout(Duration::from_millis(timeout_ms), client.get_async_pubsub())
        .await
        .map_err(|_| BroadcastError::ConnectTimeout(timeout_ms))?
        .map_err(BroadcastError::from)
}
