//! Stampede API Server Entry Point
//!
//! Bootstraps telemetry and configuration, connects the Redis store, builds
//! the five strategies, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use stampede_api::telemetry::init_telemetry;
use stampede_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState, ProductRepository};
use stampede_cache::RedisStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_telemetry()?;

    let config = ApiConfig::from_env();

    let store = RedisStore::connect(&config.redis)
        .await
        .map_err(|e| ApiError::service_unavailable(format!("Redis unavailable: {e}")))?;
    let store = Arc::new(store);

    let repo = Arc::new(ProductRepository::new(config.origin_delay));
    let state = AppState::new(store, repo, config.tuning.clone());

    let app: Router = create_api_router(state);

    let addr = resolve_bind_addr(&config)?;
    tracing::info!(%addr, "Starting stampede API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {addr}: {e}")))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {e}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr(config: &ApiConfig) -> ApiResult<SocketAddr> {
    let addr = format!("{}:{}", config.bind_host, config.port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {addr}: {e}")))
}
