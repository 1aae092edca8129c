//! Guest cart and favorites behaviour over the in-memory key-value store.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use basket_integration_tests::{Fixture, product, session, variant};
use basket_storefront::kv::KvStore;
use basket_storefront::services::{GuestCartService, GuestFavoritesService, ServiceError, keys};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// Quantities
// ============================================================================

#[tokio::test]
async fn test_repeated_adds_accumulate() {
    let fixture = Fixture::new();
    let cart = GuestCartService::new(&fixture.kv);

    cart.add_item(&session(), &variant("variant-1"), 4).await.unwrap();
    cart.add_item(&session(), &variant("variant-1"), 3).await.unwrap();

    let items = cart.get_cart(&session()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 7);
}

#[tokio::test]
async fn test_update_to_zero_removes_entry() {
    let fixture = Fixture::new();
    let cart = GuestCartService::new(&fixture.kv);
    cart.add_item(&session(), &variant("variant-1"), 2).await.unwrap();
    cart.add_item(&session(), &variant("variant-2"), 1).await.unwrap();

    let updated = cart
        .update_quantity(&session(), &variant("variant-1"), 0)
        .await
        .unwrap();

    assert!(updated.is_none());
    let items = cart.get_cart(&session()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].variant_id, variant("variant-2"));
}

#[tokio::test]
async fn test_negative_update_removes_entry() {
    let fixture = Fixture::new();
    let cart = GuestCartService::new(&fixture.kv);
    cart.add_item(&session(), &variant("variant-1"), 2).await.unwrap();

    cart.update_quantity(&session(), &variant("variant-1"), -3)
        .await
        .unwrap();

    assert!(cart.get_cart(&session()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_cart_twice() {
    let fixture = Fixture::new();
    let cart = GuestCartService::new(&fixture.kv);
    cart.add_item(&session(), &variant("variant-1"), 2).await.unwrap();

    cart.clear_cart(&session()).await.unwrap();
    cart.clear_cart(&session()).await.unwrap();

    assert!(cart.get_cart(&session()).await.unwrap().is_empty());
    assert_eq!(cart.get_cart_count(&session()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_two_variant_scenario() {
    let fixture = Fixture::new();
    let cart = GuestCartService::new(&fixture.kv);

    cart.add_item(&session(), &variant("variant-1"), 2).await.unwrap();
    cart.add_item(&session(), &variant("variant-2"), 1).await.unwrap();

    assert_eq!(cart.get_cart_count(&session()).await.unwrap(), 3);
    let mut items: Vec<_> = cart
        .get_cart(&session())
        .await
        .unwrap()
        .into_iter()
        .map(|item| (item.variant_id.to_string(), item.quantity))
        .collect();
    items.sort();
    assert_eq!(
        items,
        vec![("variant-1".to_owned(), 2), ("variant-2".to_owned(), 1)]
    );
}

#[tokio::test]
async fn test_zero_quantity_add_is_rejected() {
    let fixture = Fixture::new();
    let cart = GuestCartService::new(&fixture.kv);

    let result = cart.add_item(&session(), &variant("variant-1"), 0).await;

    assert!(matches!(result, Err(ServiceError::InvalidQuantity(0))));
    assert!(fixture.kv.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_lose_nothing() {
    let fixture = Fixture::new();

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let kv = fixture.kv.clone();
            tokio::spawn(async move {
                GuestCartService::new(&kv)
                    .add_item(&session(), &variant("variant-1"), 1)
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let count = GuestCartService::new(&fixture.kv)
        .get_cart_count(&session())
        .await
        .unwrap();
    assert_eq!(count, 50);
}

#[tokio::test]
async fn test_added_at_survives_quantity_changes() {
    let fixture = Fixture::new();
    let cart = GuestCartService::new(&fixture.kv);

    let first = cart
        .add_item(&session(), &variant("variant-1"), 1)
        .await
        .unwrap();
    cart.add_item(&session(), &variant("variant-1"), 1).await.unwrap();
    cart.update_quantity(&session(), &variant("variant-1"), 5)
        .await
        .unwrap();

    let items = cart.get_cart(&session()).await.unwrap();
    assert_eq!(items[0].quantity, 5);
    assert_eq!(items[0].added_at, first.added_at);
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_cart_expires_after_five_days() {
    let fixture = Fixture::new();
    let cart = GuestCartService::new(&fixture.kv);
    cart.add_item(&session(), &variant("variant-1"), 2).await.unwrap();

    tokio::time::advance(4 * DAY).await;
    assert_eq!(cart.get_cart_count(&session()).await.unwrap(), 2);

    tokio::time::advance(DAY + Duration::from_secs(1)).await;
    assert!(cart.get_cart(&session()).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_writes_extend_cart_lifetime() {
    let fixture = Fixture::new();
    let cart = GuestCartService::new(&fixture.kv);
    cart.add_item(&session(), &variant("variant-1"), 1).await.unwrap();

    tokio::time::advance(4 * DAY).await;
    cart.add_item(&session(), &variant("variant-2"), 1).await.unwrap();

    tokio::time::advance(4 * DAY).await;
    assert_eq!(cart.get_cart_count(&session()).await.unwrap(), 2);

    let ttl = fixture.kv.ttl(&keys::cart(&session())).await.unwrap().unwrap();
    assert!(ttl <= DAY);
}

#[tokio::test(start_paused = true)]
async fn test_favorites_expire_with_guest_ttl() {
    let fixture = Fixture::new();
    let favorites = GuestFavoritesService::new(&fixture.kv);
    favorites.add_item(&session(), &product("p1")).await.unwrap();

    tokio::time::advance(5 * DAY + Duration::from_secs(1)).await;

    assert_eq!(favorites.get_favorites_count(&session()).await.unwrap(), 0);
}

// ============================================================================
// Favorites
// ============================================================================

#[tokio::test]
async fn test_favorites_are_a_set() {
    let fixture = Fixture::new();
    let favorites = GuestFavoritesService::new(&fixture.kv);

    assert!(favorites.add_item(&session(), &product("p1")).await.unwrap());
    assert!(!favorites.add_item(&session(), &product("p1")).await.unwrap());
    assert!(favorites.add_item(&session(), &product("p2")).await.unwrap());

    assert_eq!(favorites.get_favorites_count(&session()).await.unwrap(), 2);
    assert!(favorites.is_in_favorites(&session(), &product("p1")).await.unwrap());

    assert!(favorites.remove_item(&session(), &product("p1")).await.unwrap());
    assert!(!favorites.is_in_favorites(&session(), &product("p1")).await.unwrap());

    favorites.clear_favorites(&session()).await.unwrap();
    favorites.clear_favorites(&session()).await.unwrap();
    assert!(favorites.get_favorites(&session()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_outage_surfaces_as_store_error() {
    let fixture = Fixture::new();
    fixture.kv.set_offline(true);

    let result = GuestCartService::new(&fixture.kv)
        .add_item(&session(), &variant("variant-1"), 1)
        .await;

    assert!(matches!(result, Err(ServiceError::Store(_))));
}
