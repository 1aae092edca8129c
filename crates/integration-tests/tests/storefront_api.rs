//! Smoke tests against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (basket-cli migrate) with catalog rows
//!   for `STOREFRONT_TEST_VARIANT` and `STOREFRONT_TEST_PRODUCT`
//! - Redis
//! - The storefront running (cargo run -p basket-storefront)
//!
//! Run with: cargo test -p basket-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the storefront API (configurable via environment).
fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn test_variant() -> String {
    std::env::var("STOREFRONT_TEST_VARIANT").unwrap_or_else(|_| "variant-1".to_string())
}

fn test_product() -> String {
    std::env::var("STOREFRONT_TEST_PRODUCT").unwrap_or_else(|_| "product-1".to_string())
}

/// A client that keeps the guest cookie between requests.
fn guest_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh user id so runs do not see each other's rows.
fn fresh_user() -> String {
    format!("it-{}", Uuid::new_v4())
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront, database and Redis"]
async fn test_readiness() {
    let resp = Client::new()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to call readiness");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["database"], true);
    assert_eq!(body["kv"], true);
}

// ============================================================================
// Guest to user
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront, database and Redis"]
async fn test_guest_cart_transfers_at_login() {
    let client = guest_client();
    let base = base_url();
    let user = fresh_user();

    let resp = client
        .post(format!("{base}/api/guest/cart/items"))
        .json(&json!({ "variant_id": test_variant(), "quantity": 1 }))
        .send()
        .await
        .expect("Failed to add guest item");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base}/api/guest/favorites"))
        .json(&json!({ "product_id": test_product() }))
        .send()
        .await
        .expect("Failed to add guest favorite");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base}/api/transfer"))
        .header("x-user-id", &user)
        .send()
        .await
        .expect("Failed to transfer");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true, "{body}");
    assert_eq!(body["cart"]["summary"]["total"], 1);

    let resp = client
        .get(format!("{base}/api/cart/count"))
        .header("x-user-id", &user)
        .send()
        .await
        .expect("Failed to count cart");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 1);

    let resp = client
        .get(format!("{base}/api/favorites/{}", test_product()))
        .header("x-user-id", &user)
        .send()
        .await
        .expect("Failed to check favorite");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["is_favorite"], true);

    // The guest cookie was expired by the transfer.
    let resp = client
        .get(format!("{base}/api/guest/cart/count"))
        .send()
        .await
        .expect("Failed to count guest cart");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 0);

    client
        .delete(format!("{base}/api/cart"))
        .header("x-user-id", &user)
        .send()
        .await
        .expect("Failed to clean up cart");
}

// ============================================================================
// User cart
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront, database and Redis"]
async fn test_user_cart_lifecycle() {
    let client = Client::new();
    let base = base_url();
    let user = fresh_user();
    let variant = test_variant();

    let resp = client
        .post(format!("{base}/api/cart/items"))
        .header("x-user-id", &user)
        .json(&json!({ "variant_id": variant }))
        .send()
        .await
        .expect("Failed to add item");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .put(format!("{base}/api/cart/items/{variant}"))
        .header("x-user-id", &user)
        .json(&json!({ "quantity": 2 }))
        .send()
        .await
        .expect("Failed to update item");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/api/cart"))
        .header("x-user-id", &user)
        .send()
        .await
        .expect("Failed to get cart");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["cart"]["item_count"], 2);

    let resp = client
        .get(format!("{base}/api/cart/validate"))
        .header("x-user-id", &user)
        .send()
        .await
        .expect("Failed to validate cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .put(format!("{base}/api/cart/items/{variant}"))
        .header("x-user-id", &user)
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .expect("Failed to remove item");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .put(format!("{base}/api/cart/items/{variant}"))
        .header("x-user-id", &user)
        .json(&json!({ "quantity": 1 }))
        .send()
        .await
        .expect("Failed to update missing item");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront, database and Redis"]
async fn test_unknown_variant_conflicts() {
    let resp = Client::new()
        .post(format!("{}/api/cart/items", base_url()))
        .header("x-user-id", fresh_user())
        .json(&json!({ "variant_id": format!("missing-{}", Uuid::new_v4()) }))
        .send()
        .await
        .expect("Failed to add item");

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}
