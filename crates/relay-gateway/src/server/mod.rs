//! Gateway server setup
//!
//! Provides the WebSocket routes, the store and medium wiring, and the
//! listener loop with graceful shutdown.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::gateway::BroadcastMedium;
use axum::{http::HeaderValue, routing::get, Router};
use relay_common::{AppConfig, AppError, CorsConfig};
use relay_core::SharedChatStore;
use relay_store::{create_pool, MemoryChatStore, PgChatStore};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/", get(gateway_handler))
        .route("/ws", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    let cors = create_cors_layer(&state.config().cors);

    create_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Create CORS layer from configuration
///
/// No configured origins means any origin is accepted.
fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    let base_layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.is_empty() {
        return base_layer.allow_origin(Any);
    }

    let origins = parse_origins(config);
    tracing::info!("CORS: Allowing {} configured origins", origins.len());
    base_layer.allow_origin(AllowOrigin::list(origins))
}

fn parse_origins(config: &CorsConfig) -> Vec<HeaderValue> {
    config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect()
}

/// Open the store and the broadcast medium and create `GatewayState`
///
/// Without `DATABASE_URL` the gateway runs on a seeded in-memory store.
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let store: SharedChatStore = match &config.database {
        Some(database) => {
            tracing::info!("Connecting to PostgreSQL...");
            let pool = create_pool(&relay_store::DatabaseConfig::from(database))
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            let store = PgChatStore::new(pool);
            store
                .ensure_schema()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            tracing::info!("PostgreSQL connection established");

            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryChatStore::seeded())
        }
    };

    let medium = BroadcastMedium::Redis(config.redis.clone());
    let state = GatewayState::build(config, store, &medium).await?;
    tracing::info!("Redis connection established");

    Ok(state)
}

/// Serve the gateway on a bound listener until `shutdown` resolves
///
/// Subscriber loops are stopped and the registry cleared before returning.
pub async fn serve<F>(listener: TcpListener, state: GatewayState, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(state.clone());

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Server(e.to_string()));

    state.shutdown().await;
    result
}

/// Resolve on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.gateway.address();

    let state = create_gateway_state(config).await?;

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            state.shutdown().await;
            return Err(AppError::Server(format!("Failed to bind to {addr}: {e}")));
        }
    };

    tracing::info!("Gateway listening on ws://{}", addr);

    serve(listener, state, shutdown_signal()).await
}
