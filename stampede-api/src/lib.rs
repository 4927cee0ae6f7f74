//! Stampede API
//!
//! HTTP surface for comparing the cache-stampede strategies: one product
//! endpoint per strategy, an admin surface for seeding data and inspecting
//! origin load, and health endpoints. The product repository simulates the
//! slow database the cache is protecting.

pub mod config;
pub mod error;
pub mod repo;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use repo::{ProductLoader, ProductRepository};
pub use state::{AppState, Strategies};
pub use types::{CreateProductRequest, OriginStatsResponse, Product};

use axum::Router;
use stampede_cache::RemoteStore;

/// Assemble the full application router.
pub fn create_api_router<S: RemoteStore>(state: AppState<S>) -> Router {
    Router::new()
        .nest("/products", routes::product::create_router(state.clone()))
        .nest("/admin", routes::admin::create_router(state.clone()))
        .nest("/health", routes::health::create_router(state))
}
