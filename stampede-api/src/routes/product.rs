//! Product Endpoints
//!
//! One endpoint per strategy: `GET /products/{strategy}/{id}` selects the
//! named strategy and serves the product through its `get_or_load`. All five
//! strategies read the same logical product id but write to disjoint cache
//! namespaces, so their behavior under load is directly comparable.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use stampede_cache::{CacheStrategy, RemoteStore, ValueLoader};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::repo::ProductLoader;
use crate::state::AppState;
use crate::types::Product;

/// GET /products/{strategy}/{id}
pub async fn get_product<S: RemoteStore>(
    State(state): State<AppState<S>>,
    Path((strategy, product_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Product>> {
    let loader: Arc<dyn ValueLoader<Product>> =
        Arc::new(ProductLoader::new(Arc::clone(&state.repo), product_id));
    let key = product_id.to_string();

    let strategies = &state.strategies;
    let result = match strategy.as_str() {
        "basic" => strategies.basic.get_or_load::<Product>(&key, loader).await,
        "jitter" => strategies.jitter.get_or_load::<Product>(&key, loader).await,
        "jitter-swr" => {
            strategies
                .jitter_swr
                .get_or_load::<Product>(&key, loader)
                .await
        }
        "jitter-lock" => {
            strategies
                .jitter_lock
                .get_or_load::<Product>(&key, loader)
                .await
        }
        "full-protection" => {
            strategies
                .full_protection
                .get_or_load::<Product>(&key, loader)
                .await
        }
        _ => return Err(ApiError::strategy_not_found(&strategy)),
    };

    match result {
        Ok(Some(product)) => Ok(Json(product)),
        Ok(None) => Err(ApiError::product_not_found(product_id)),
        Err(error) => Err(error.into()),
    }
}

/// Create the product router.
pub fn create_router<S: RemoteStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/{strategy}/{id}", get(get_product::<S>))
        .with_state(state)
}
