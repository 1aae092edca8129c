//! Persistent cart and favorites checked against the catalog.

#![allow(clippy::unwrap_used)]

use basket_core::{AvailabilityStatus, MAX_LINE_QUANTITY};
use basket_integration_tests::{Fixture, catalog_variant, product, user, variant};
use basket_storefront::services::{CartService, FavoritesService, ServiceError};
use rust_decimal::Decimal;

fn fixture() -> Fixture {
    Fixture::with_catalog([
        catalog_variant("variant-1", "p1", 500, 5),
        catalog_variant("variant-2", "p2", 250, 10),
    ])
}

// ============================================================================
// Adding
// ============================================================================

#[tokio::test]
async fn test_add_accumulates_within_stock() {
    let fixture = fixture();
    let cart = CartService::new(&fixture.store, &fixture.catalog);

    cart.add_to_cart(&user(), &variant("variant-1"), 2).await.unwrap();
    let row = cart
        .add_to_cart(&user(), &variant("variant-1"), 3)
        .await
        .unwrap();

    assert_eq!(row.quantity(), 5);
    assert_eq!(cart.get_cart_item_count(&user()).await.unwrap(), 5);
}

#[tokio::test]
async fn test_add_beyond_stock_counts_existing_line() {
    let fixture = fixture();
    let cart = CartService::new(&fixture.store, &fixture.catalog);
    cart.add_to_cart(&user(), &variant("variant-1"), 4).await.unwrap();

    let result = cart.add_to_cart(&user(), &variant("variant-1"), 2).await;

    assert!(matches!(
        result,
        Err(ServiceError::Unavailable { requested: 6, .. })
    ));
    assert_eq!(fixture.store.quantity(&user(), &variant("variant-1")), Some(4));
}

#[tokio::test]
async fn test_add_inactive_or_unknown_variant_fails() {
    let fixture = fixture();
    fixture.catalog.set_variant_active(&variant("variant-2"), false);
    let cart = CartService::new(&fixture.store, &fixture.catalog);

    for id in ["variant-2", "variant-9"] {
        let result = cart.add_to_cart(&user(), &variant(id), 1).await;
        assert!(matches!(result, Err(ServiceError::Unavailable { .. })));
    }
    assert_eq!(cart.get_cart_item_count(&user()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_add_zero_is_invalid() {
    let fixture = fixture();
    let result = CartService::new(&fixture.store, &fixture.catalog)
        .add_to_cart(&user(), &variant("variant-1"), 0)
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidQuantity(0))));
}

// ============================================================================
// Updating
// ============================================================================

#[tokio::test]
async fn test_update_sets_quantity() {
    let fixture = fixture();
    let cart = CartService::new(&fixture.store, &fixture.catalog);
    cart.add_to_cart(&user(), &variant("variant-2"), 1).await.unwrap();

    let row = cart
        .update_cart_item(&user(), &variant("variant-2"), 8)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(row.quantity(), 8);
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let fixture = fixture();
    let cart = CartService::new(&fixture.store, &fixture.catalog);
    cart.add_to_cart(&user(), &variant("variant-2"), 1).await.unwrap();

    let row = cart
        .update_cart_item(&user(), &variant("variant-2"), 0)
        .await
        .unwrap();

    assert!(row.is_none());
    assert_eq!(fixture.store.quantity(&user(), &variant("variant-2")), None);
}

#[tokio::test]
async fn test_update_missing_line_is_not_found() {
    let fixture = fixture();
    let cart = CartService::new(&fixture.store, &fixture.catalog);

    let set = cart.update_cart_item(&user(), &variant("variant-1"), 2).await;
    let removed = cart.update_cart_item(&user(), &variant("variant-1"), 0).await;

    assert!(matches!(set, Err(ServiceError::ItemNotFound(_))));
    assert!(matches!(removed, Err(ServiceError::ItemNotFound(_))));
}

#[tokio::test]
async fn test_update_missing_line_of_sold_out_variant_is_not_found() {
    let fixture = fixture();
    fixture.catalog.set_stock(&variant("variant-1"), 0);
    let cart = CartService::new(&fixture.store, &fixture.catalog);

    for id in ["variant-1", "variant-9"] {
        let result = cart.update_cart_item(&user(), &variant(id), 2).await;
        assert!(matches!(result, Err(ServiceError::ItemNotFound(_))));
    }
}

#[tokio::test]
async fn test_quantities_above_line_limit_are_rejected() {
    let fixture = Fixture::with_catalog([catalog_variant("variant-3", "p3", 100, i32::MAX)]);
    let cart = CartService::new(&fixture.store, &fixture.catalog);
    cart.add_to_cart(&user(), &variant("variant-3"), MAX_LINE_QUANTITY)
        .await
        .unwrap();

    let added = cart.add_to_cart(&user(), &variant("variant-3"), 1).await;
    let updated = cart
        .update_cart_item(&user(), &variant("variant-3"), 3_000_000_000)
        .await;

    assert!(matches!(added, Err(ServiceError::InvalidQuantity(10_000))));
    assert!(matches!(
        updated,
        Err(ServiceError::InvalidQuantity(3_000_000_000))
    ));
    assert_eq!(
        cart.get_cart_item_count(&user()).await.unwrap(),
        u64::from(MAX_LINE_QUANTITY)
    );
}

#[tokio::test]
async fn test_update_beyond_stock_is_rejected() {
    let fixture = fixture();
    let cart = CartService::new(&fixture.store, &fixture.catalog);
    cart.add_to_cart(&user(), &variant("variant-1"), 1).await.unwrap();

    let result = cart.update_cart_item(&user(), &variant("variant-1"), 6).await;

    assert!(matches!(result, Err(ServiceError::Unavailable { .. })));
    assert_eq!(fixture.store.quantity(&user(), &variant("variant-1")), Some(1));
}

// ============================================================================
// Summary and validation
// ============================================================================

#[tokio::test]
async fn test_summary_prices_and_filters_lines() {
    let fixture = fixture();
    let cart = CartService::new(&fixture.store, &fixture.catalog);
    cart.add_to_cart(&user(), &variant("variant-1"), 2).await.unwrap();
    cart.add_to_cart(&user(), &variant("variant-2"), 3).await.unwrap();

    let summary = cart.get_cart(&user()).await.unwrap();
    assert_eq!(summary.items.len(), 2);
    assert_eq!(summary.subtotal.amount, Decimal::new(1750, 0));
    assert_eq!(summary.item_count, 5);

    fixture.catalog.set_product_active(&product("p1"), false);
    let summary = cart.get_cart(&user()).await.unwrap();
    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.items[0].variant_id, variant("variant-2"));
    assert_eq!(summary.subtotal.amount, Decimal::new(750, 0));
}

#[tokio::test]
async fn test_validation_flags_stock_changes() {
    let fixture = fixture();
    let cart = CartService::new(&fixture.store, &fixture.catalog);
    cart.add_to_cart(&user(), &variant("variant-1"), 3).await.unwrap();
    cart.add_to_cart(&user(), &variant("variant-2"), 1).await.unwrap();
    assert!(cart.validate_cart(&user()).await.unwrap().valid);

    fixture.catalog.set_stock(&variant("variant-1"), 1);
    fixture.catalog.remove(&variant("variant-2"));

    let validation = cart.validate_cart(&user()).await.unwrap();
    assert!(!validation.valid);
    let statuses: Vec<_> = validation.issues.iter().map(|i| i.status).collect();
    assert_eq!(
        statuses,
        vec![
            AvailabilityStatus::InsufficientStock,
            AvailabilityStatus::Missing
        ]
    );
}

#[tokio::test]
async fn test_empty_cart_is_not_checkout_ready() {
    let fixture = fixture();
    let validation = CartService::new(&fixture.store, &fixture.catalog)
        .validate_cart(&user())
        .await
        .unwrap();
    assert!(!validation.valid);
    assert!(validation.issues.is_empty());
}

#[tokio::test]
async fn test_catalog_outage_is_repository_error() {
    let fixture = fixture();
    fixture.catalog.set_offline(true);
    let result = CartService::new(&fixture.store, &fixture.catalog)
        .add_to_cart(&user(), &variant("variant-1"), 1)
        .await;
    assert!(matches!(result, Err(ServiceError::Repository(_))));
}

// ============================================================================
// Favorites
// ============================================================================

#[tokio::test]
async fn test_favorites_round_trip() {
    let fixture = fixture();
    let favorites = FavoritesService::new(&fixture.store);

    assert!(favorites.add_favorite(&user(), &product("p1")).await.unwrap());
    assert!(!favorites.add_favorite(&user(), &product("p1")).await.unwrap());
    assert!(favorites.add_favorite(&user(), &product("p2")).await.unwrap());
    assert_eq!(favorites.get_favorites_count(&user()).await.unwrap(), 2);
    assert!(favorites.is_favorite(&user(), &product("p2")).await.unwrap());

    assert!(favorites.remove_favorite(&user(), &product("p2")).await.unwrap());
    let rows = favorites.get_favorites(&user()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product_id, product("p1"));
}
