//! Admin Endpoints
//!
//! Seeding and inspection surface for load experiments:
//! - POST /admin/products - seed a product into the simulated database
//! - GET /admin/origin/stats - origin hit counter
//! - DELETE /admin/cache/{strategy}/{id} - invalidate one strategy's entry

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use stampede_cache::{CacheStrategy, RemoteStore};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{CreateProductRequest, OriginStatsResponse, Product};

/// POST /admin/products
pub async fn create_product<S: RemoteStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    if request.name.trim().is_empty() {
        return Err(ApiError::invalid_input("Product name must not be empty"));
    }
    if request.price_cents < 0 {
        return Err(ApiError::invalid_input("Product price must not be negative"));
    }

    let product = state.repo.create(request);
    tracing::info!(product_id = %product.product_id, name = %product.name, "product seeded");
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /admin/origin/stats
pub async fn origin_stats<S: RemoteStore>(
    State(state): State<AppState<S>>,
) -> Json<OriginStatsResponse> {
    Json(OriginStatsResponse {
        origin_hits: state.repo.origin_hits(),
        product_count: state.repo.len(),
    })
}

/// DELETE /admin/cache/{strategy}/{id}
pub async fn invalidate_cache<S: RemoteStore>(
    State(state): State<AppState<S>>,
    Path((strategy, product_id)): Path<(String, Uuid)>,
) -> ApiResult<StatusCode> {
    let key = product_id.to_string();
    let strategies = &state.strategies;

    let result = match strategy.as_str() {
        "basic" => strategies.basic.invalidate(&key).await,
        "jitter" => strategies.jitter.invalidate(&key).await,
        "jitter-swr" => strategies.jitter_swr.invalidate(&key).await,
        "jitter-lock" => strategies.jitter_lock.invalidate(&key).await,
        "full-protection" => strategies.full_protection.invalidate(&key).await,
        _ => return Err(ApiError::strategy_not_found(&strategy)),
    };

    result.map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the admin router.
pub fn create_router<S: RemoteStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/products", post(create_product::<S>))
        .route("/origin/stats", get(origin_stats::<S>))
        .route("/cache/{strategy}/{id}", delete(invalidate_cache::<S>))
        .with_state(state)
}
