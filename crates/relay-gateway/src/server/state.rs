//! Gateway state
//!
//! Application state shared by every WebSocket handler.

use crate::adapter::ClusterAdapter;
use crate::connection::ConnectionRegistry;
use crate::gateway::{BroadcastMedium, ChatGateway, GatewayResult};
use relay_common::AppConfig;
use relay_core::SharedChatStore;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Chat gateway (store, publisher, subscriber loop)
    gateway: Arc<ChatGateway>,
    /// Local WebSocket connections and room memberships
    registry: Arc<ConnectionRegistry>,
    /// Cross-process room broadcaster, when enabled
    adapter: Option<Arc<ClusterAdapter>>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Connect to the broadcast medium and start the gateway (and adapter)
    ///
    /// Fails without accepting connections if the medium is unreachable.
    pub async fn build(
        config: AppConfig,
        store: SharedChatStore,
        medium: &BroadcastMedium,
    ) -> GatewayResult<Self> {
        let registry = ConnectionRegistry::new_shared();

        let gateway = ChatGateway::initialize(store, medium, registry.clone(), &config.relay).await?;

        let adapter = if config.relay.adapter_enabled {
            Some(
                ClusterAdapter::start(
                    gateway.origin(),
                    registry.clone(),
                    gateway.publisher().clone(),
                    gateway.subscriber(),
                )
                .await?,
            )
        } else {
            None
        };

        tracing::info!(
            medium = medium.kind(),
            adapter = adapter.is_some(),
            "Gateway state ready"
        );

        Ok(Self {
            gateway,
            registry,
            adapter,
            config: Arc::new(config),
        })
    }

    /// Get the chat gateway
    pub fn gateway(&self) -> &ChatGateway {
        &self.gateway
    }

    /// Get the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the cluster adapter, if enabled
    pub fn adapter(&self) -> Option<&ClusterAdapter> {
        self.adapter.as_deref()
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Stop subscriber loops and drop every connection
    pub async fn shutdown(&self) {
        if let Some(adapter) = &self.adapter {
            adapter.stop();
        }
        self.gateway.shutdown().await;
        self.registry.clear();

        tracing::info!("Gateway state shut down");
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("gateway", &self.gateway)
            .field("adapter", &self.adapter)
            .field("config", &"AppConfig")
            .finish()
    }
}
