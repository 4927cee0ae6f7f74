//! Request and response types for the API surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The product entity served through every strategy endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: Uuid,
    pub name: String,
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for seeding a product.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Origin hit counter, used to compare strategies under load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginStatsResponse {
    pub origin_hits: u64,
    pub product_count: usize,
}
