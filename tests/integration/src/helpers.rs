//! Test helpers for integration tests
//!
//! Provides utilities for spawning gateway nodes and talking to them over
//! WebSocket and plain HTTP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use relay_broadcast::MemoryBroadcast;
use relay_common::{AppConfig, AppError};
use relay_core::{RoomId, SharedChatStore};
use relay_gateway::{serve, BroadcastMedium, GatewayState};
use relay_store::MemoryChatStore;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// How long to wait for an expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to listen when asserting that nothing arrives
pub const SILENCE_WINDOW: Duration = Duration::from_millis(300);

/// Gateway nodes sharing one broadcast medium and one store
pub struct TestCluster {
    bus: MemoryBroadcast,
    store: SharedChatStore,
}

impl TestCluster {
    /// Rooms 1, 2 and 5 exist; users 1 and 2 exist
    pub fn new() -> Self {
        Self {
            bus: MemoryBroadcast::recording(),
            store: Arc::new(MemoryChatStore::seeded().with_room(RoomId::new(5), "Rust")),
        }
    }

    /// The shared medium, which records every payload
    pub fn bus(&self) -> &MemoryBroadcast {
        &self.bus
    }

    /// Start a node with default settings
    pub async fn start_node(&self, instance_id: &str) -> Result<TestNode> {
        self.start_node_with(instance_id, &[]).await
    }

    /// Start a node with extra configuration variables
    pub async fn start_node_with(&self, instance_id: &str, vars: &[(&str, &str)]) -> Result<TestNode> {
        let config = test_config(instance_id, vars)?;
        let medium = BroadcastMedium::Memory(self.bus.clone());
        let state = GatewayState::build(config, self.store.clone(), &medium).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, state.clone(), async move {
            let _ = shutdown_rx.await;
        }));

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(TestNode {
            addr,
            state,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }
}

impl Default for TestCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a configuration from defaults plus the given variables
pub fn test_config(instance_id: &str, vars: &[(&str, &str)]) -> Result<AppConfig> {
    let mut env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    env.insert("INSTANCE_ID".to_string(), instance_id.to_string());

    Ok(AppConfig::from_lookup(move |key| env.get(key).cloned())?)
}

/// One running gateway process
pub struct TestNode {
    pub addr: SocketAddr,
    pub state: GatewayState,
    client: Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), AppError>>>,
}

impl TestNode {
    /// HTTP base URL for the node
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL on the given path
    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Open a WebSocket client on `/ws`
    pub async fn connect(&self) -> Result<WsClient> {
        self.connect_path("/ws").await
    }

    /// Open a WebSocket client on the given path
    pub async fn connect_path(&self, path: &str) -> Result<WsClient> {
        let (stream, _) = connect_async(self.ws_url(path)).await?;
        Ok(WsClient { stream })
    }

    /// HTTP GET on the given path
    pub async fn http_get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Trigger graceful shutdown and wait for the server loop to return
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await??;
        }
        Ok(())
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// WebSocket client speaking `{ event, data }` frames
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send an event frame
    pub async fn send_event(&mut self, event: &str, data: Value) -> Result<()> {
        let frame = json!({ "event": event, "data": data });
        self.send_text(&frame.to_string()).await
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Send a raw binary frame
    pub async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.stream.send(Message::Binary(bytes)).await?;
        Ok(())
    }

    /// Send `join` for a room
    pub async fn join(&mut self, room_id: i64) -> Result<()> {
        self.send_event("join", json!({ "roomId": room_id })).await
    }

    /// Send `join` and wait for the `room` reply
    pub async fn join_and_wait(&mut self, room_id: i64) -> Result<Value> {
        self.join(room_id).await?;
        self.expect_event("room").await
    }

    /// Send a chat `message`
    pub async fn say(&mut self, user_id: i64, room_id: i64, message: &str) -> Result<()> {
        self.send_event(
            "message",
            json!({ "userId": user_id, "roomId": room_id, "message": message }),
        )
        .await
    }

    /// Next event frame within the window, or `None` on timeout or close
    pub async fn recv_event_within(&mut self, window: Duration) -> Result<Option<Value>> {
        let deadline = tokio::time::Instant::now() + window;

        loop {
            let Ok(next) = tokio::time::timeout_at(deadline, self.stream.next()).await else {
                return Ok(None);
            };

            match next {
                Some(Ok(Message::Text(text))) => return Ok(Some(serde_json::from_str(&text)?)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Wait for an event with the given name and return its `data`
    pub async fn expect_event(&mut self, name: &str) -> Result<Value> {
        let Some(frame) = self.recv_event_within(RECV_TIMEOUT).await? else {
            anyhow::bail!("Expected '{name}' event, got nothing");
        };

        if frame["event"] != name {
            anyhow::bail!("Expected '{name}' event, got {frame}");
        }
        Ok(frame["data"].clone())
    }

    /// Assert that no event arrives within the silence window
    pub async fn expect_silence(&mut self) -> Result<()> {
        if let Some(frame) = self.recv_event_within(SILENCE_WINDOW).await? {
            anyhow::bail!("Expected no event, got {frame}");
        }
        Ok(())
    }

    /// Wait for the server's close frame and return its code
    pub async fn recv_close_code(&mut self) -> Result<Option<u16>> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;

        loop {
            let Ok(next) = tokio::time::timeout_at(deadline, self.stream.next()).await else {
                anyhow::bail!("Connection was not closed");
            };

            match next {
                Some(Ok(Message::Close(frame))) => return Ok(frame.map(|f| u16::from(f.code))),
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Ok(None),
            }
        }
    }
}
