//! Integration tests for Basket.
//!
//! # Running Tests
//!
//! ```bash
//! # Service and router tests (in-memory stores, no infrastructure)
//! cargo test -p basket-integration-tests
//!
//! # HTTP smoke tests against a running server
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p basket-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `guest_cart` - Guest cart and favorites behaviour over the key-value store
//! - `transfer` - Guest-to-user merge
//! - `user_cart` - Persistent cart against the catalog
//! - `router` - The axum router driven in-process
//! - `storefront_api` - Live server smoke tests (ignored by default)
//!
//! This crate only holds shared fixtures.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::Router;
use basket_core::{ProductId, SessionId, UserId, VariantId};
use basket_storefront::config::StorefrontConfig;
use basket_storefront::db::memory::{MemoryCartStore, MemoryCatalog};
use basket_storefront::kv::{KvBackend, MemoryStore};
use basket_storefront::models::VariantDetails;
use basket_storefront::state::AppState;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;

/// The guest session used throughout the scenarios.
#[must_use]
pub fn session() -> SessionId {
    SessionId::parse("guest_abc_1").unwrap()
}

/// The signed-in user used throughout the scenarios.
#[must_use]
pub fn user() -> UserId {
    UserId::parse("user-42").unwrap()
}

/// Parse a variant id.
#[must_use]
pub fn variant(id: &str) -> VariantId {
    VariantId::parse(id).unwrap()
}

/// Parse a product id.
#[must_use]
pub fn product(id: &str) -> ProductId {
    ProductId::parse(id).unwrap()
}

/// An active catalog variant priced in whole rupees.
#[must_use]
pub fn catalog_variant(id: &str, product_id: &str, price: i64, stock: i32) -> VariantDetails {
    VariantDetails {
        variant_id: variant(id),
        product_id: product(product_id),
        product_name: format!("Product {product_id}"),
        product_active: true,
        variant_title: None,
        sku: format!("SKU-{id}"),
        price: Decimal::new(price, 0),
        compare_at_price: None,
        stock_quantity: stock,
        variant_active: true,
        image_url: None,
    }
}

/// In-memory stand-ins for Redis, the cart tables and the catalog.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub kv: MemoryStore,
    pub store: MemoryCartStore,
    pub catalog: MemoryCatalog,
}

impl Fixture {
    /// Empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty stores over a catalog holding `variants`.
    #[must_use]
    pub fn with_catalog(variants: impl IntoIterator<Item = VariantDetails>) -> Self {
        let fixture = Self::new();
        for details in variants {
            fixture.catalog.insert(details);
        }
        fixture
    }
}

/// Configuration for in-process router tests.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig::from_lookup(|key| match key {
        "STOREFRONT_DATABASE_URL" => Some("postgres://basket@localhost/basket_test".to_owned()),
        "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_owned()),
        _ => None,
    })
    .unwrap()
}

/// The full router over `kv` and a pool that never connects.
///
/// Only routes that stay off `PostgreSQL` can be exercised this way.
#[must_use]
pub fn test_app(kv: &MemoryStore) -> Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://basket@localhost/basket_test")
        .unwrap();
    let state = AppState::new(config, pool, KvBackend::Memory(kv.clone()));
    basket_storefront::app(state)
}
