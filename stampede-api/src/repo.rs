//! Product repository - the slow origin the cache is protecting.
//!
//! An in-process product table with a configurable artificial latency per
//! read and an origin hit counter, so the load generator can measure how
//! well each strategy shields the origin. Seeding goes through the admin
//! surface.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use stampede_cache::ValueLoader;
use stampede_core::OriginError;
use uuid::Uuid;

use crate::types::{CreateProductRequest, Product};

/// Simulated slow product database.
pub struct ProductRepository {
    products: DashMap<Uuid, Product>,
    origin_hits: AtomicU64,
    delay: Duration,
}

impl ProductRepository {
    pub fn new(delay: Duration) -> Self {
        Self {
            products: DashMap::new(),
            origin_hits: AtomicU64::new(0),
            delay,
        }
    }

    /// Fetch a product, paying the simulated query latency.
    pub async fn fetch(&self, product_id: Uuid) -> Option<Product> {
        let hits = self.origin_hits.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(%product_id, origin_hits = hits, "origin query");

        tokio::time::sleep(self.delay).await;
        self.products.get(&product_id).map(|entry| entry.clone())
    }

    /// Insert a new product from a seed request.
    pub fn create(&self, request: CreateProductRequest) -> Product {
        let product = Product {
            product_id: Uuid::new_v4(),
            name: request.name,
            price_cents: request.price_cents,
            description: request.description,
            updated_at: Utc::now(),
        };
        self.products.insert(product.product_id, product.clone());
        product
    }

    /// Insert or replace a product directly.
    pub fn upsert(&self, product: Product) {
        self.products.insert(product.product_id, product);
    }

    /// Total origin queries since startup.
    pub fn origin_hits(&self) -> u64 {
        self.origin_hits.load(Ordering::SeqCst)
    }

    /// Number of seeded products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// [`ValueLoader`] adapter binding the repository to one product id.
pub struct ProductLoader {
    repo: Arc<ProductRepository>,
    product_id: Uuid,
}

impl ProductLoader {
    pub fn new(repo: Arc<ProductRepository>, product_id: Uuid) -> Self {
        Self { repo, product_id }
    }
}

#[async_trait]
impl ValueLoader<Product> for ProductLoader {
    async fn load(&self) -> Result<Option<Product>, OriginError> {
        Ok(self.repo.fetch(self.product_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_counts_and_delays() {
        let repo = ProductRepository::new(Duration::from_millis(30));
        let product = repo.create(CreateProductRequest {
            name: "Widget".to_string(),
            price_cents: 100,
            description: None,
        });

        let started = std::time::Instant::now();
        let fetched = repo.fetch(product.product_id).await;
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(fetched, Some(product));
        assert_eq!(repo.origin_hits(), 1);
    }

    #[tokio::test]
    async fn test_fetch_missing_product_counts_as_origin_hit() {
        let repo = ProductRepository::new(Duration::ZERO);
        assert_eq!(repo.fetch(Uuid::new_v4()).await, None);
        assert_eq!(repo.origin_hits(), 1);
    }

    #[tokio::test]
    async fn test_loader_adapter() {
        let repo = Arc::new(ProductRepository::new(Duration::ZERO));
        let product = repo.create(CreateProductRequest {
            name: "Widget".to_string(),
            price_cents: 100,
            description: None,
        });

        let loader = ProductLoader::new(Arc::clone(&repo), product.product_id);
        let loaded = loader.load().await.expect("origin reachable");
        assert_eq!(loaded, Some(product));
    }
}
