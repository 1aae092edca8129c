//! HTTP route handlers for storefront.
//!
//! Every body is JSON shaped `{ "success": bool, "message": str, ... }`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - PostgreSQL + key-value store reachability
//!
//! # Guest (np_guest cookie or x-guest-session header)
//! POST   /api/guest/session             - Start a guest session (sets cookie)
//! DELETE /api/guest/session             - End a guest session
//! GET    /api/guest/cart                - Guest cart
//! DELETE /api/guest/cart                - Clear guest cart
//! GET    /api/guest/cart/count          - Total units
//! POST   /api/guest/cart/items          - Add { variant_id, quantity? }
//! PUT    /api/guest/cart/items/{variant} - Set { quantity }
//! DELETE /api/guest/cart/items/{variant} - Remove
//! GET    /api/guest/favorites           - Favorite product ids
//! DELETE /api/guest/favorites           - Clear favorites
//! GET    /api/guest/favorites/count     - Number of favorites
//! POST   /api/guest/favorites           - Add { product_id }
//! GET    /api/guest/favorites/{product} - Membership
//! DELETE /api/guest/favorites/{product} - Remove
//!
//! # User (identified by the auth gateway header)
//! GET    /api/cart                      - Priced summary
//! DELETE /api/cart                      - Clear
//! GET    /api/cart/count                - Total units
//! GET    /api/cart/validate             - Checkout readiness
//! POST   /api/cart/items                - Add { variant_id, quantity? }
//! PUT    /api/cart/items/{variant}      - Set { quantity }
//! DELETE /api/cart/items/{variant}      - Remove
//! GET    /api/favorites                 - Favorites
//! POST   /api/favorites                 - Add { product_id }
//! GET    /api/favorites/count           - Number of favorites
//! GET    /api/favorites/{product}       - Membership
//! DELETE /api/favorites/{product}       - Remove
//! POST   /api/transfer                  - Merge the guest session into the user
//! ```

pub mod cart;
pub mod favorites;
pub mod guest;
pub mod health;
pub mod transfer;

use axum::{
    Router,
    routing::{get, post, put},
};
use basket_core::{MAX_LINE_QUANTITY, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::ServiceError;
use crate::state::AppState;

/// Body of an add-to-cart request.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub variant_id: String,
    pub quantity: Option<i64>,
}

/// Body of a set-quantity request.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// Body of an add-favorite request.
#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub product_id: String,
}

/// Payload for count endpoints.
#[derive(Debug, Serialize)]
pub struct CountPayload {
    pub count: u64,
}

/// Payload for favorite membership and add/remove results.
#[derive(Debug, Serialize)]
pub struct MembershipPayload {
    pub product_id: ProductId,
    pub is_favorite: bool,
}

/// Quantity for an add request: defaults to 1, must be in `1..=MAX_LINE_QUANTITY`.
fn add_quantity(quantity: Option<i64>) -> Result<u32, AppError> {
    let quantity = quantity.unwrap_or(1);
    u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q))
        .ok_or(AppError::Service(ServiceError::InvalidQuantity(quantity)))
}

/// Create the guest routes router.
pub fn guest_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/session",
            post(guest::start_session).delete(guest::end_session),
        )
        .route("/cart", get(guest::show_cart).delete(guest::clear_cart))
        .route("/cart/count", get(guest::cart_count))
        .route("/cart/items", post(guest::add_item))
        .route(
            "/cart/items/{variant}",
            put(guest::update_item).delete(guest::remove_item),
        )
        .route(
            "/favorites",
            get(guest::list_favorites)
                .post(guest::add_favorite)
                .delete(guest::clear_favorites),
        )
        .route("/favorites/count", get(guest::favorites_count))
        .route(
            "/favorites/{product}",
            get(guest::is_favorite).delete(guest::remove_favorite),
        )
}

/// Create the user cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/count", get(cart::count))
        .route("/validate", get(cart::validate))
        .route("/items", post(cart::add))
        .route("/items/{variant}", put(cart::update).delete(cart::remove))
}

/// Create the user favorites routes router.
pub fn favorites_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::list).post(favorites::add))
        .route("/count", get(favorites::count))
        .route(
            "/{product}",
            get(favorites::show).delete(favorites::remove),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/guest", guest_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/favorites", favorites_routes())
        .route("/api/transfer", post(transfer::transfer))
}
