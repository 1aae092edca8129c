//! Signed-in user's cart.

use axum::{
    Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    response::IntoResponse,
};
use basket_core::VariantId;
use serde::Serialize;
use tracing::instrument;

use super::{AddItemRequest, CountPayload, UpdateItemRequest, add_quantity};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::models::{ApiResponse, CartRow, CartSummary, CartValidation};
use crate::services::CartService;
use crate::state::AppState;

/// Payload for a single cart row; `item` is null once removed.
#[derive(Debug, Serialize)]
pub struct CartItemPayload {
    pub item: Option<CartRow>,
}

/// Payload for the cart summary.
#[derive(Debug, Serialize)]
pub struct CartPayload {
    pub cart: CartSummary,
}

/// Payload for the checkout readiness check.
#[derive(Debug, Serialize)]
pub struct ValidationPayload {
    pub validation: CartValidation,
}

/// Show the priced cart.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<impl IntoResponse> {
    let (store, catalog) = (state.cart_store(), state.catalog());
    let cart = CartService::new(&store, &catalog).get_cart(&user_id).await?;
    Ok(Json(ApiResponse::ok("Cart retrieved", CartPayload { cart })))
}

/// Remove every line.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<impl IntoResponse> {
    let (store, catalog) = (state.cart_store(), state.catalog());
    let removed = CartService::new(&store, &catalog)
        .clear_cart(&user_id)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Cart cleared",
        CountPayload { count: removed },
    )))
}

/// Total units in the cart.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn count(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<impl IntoResponse> {
    let (store, catalog) = (state.cart_store(), state.catalog());
    let count = CartService::new(&store, &catalog)
        .get_cart_item_count(&user_id)
        .await?;
    Ok(Json(ApiResponse::ok("Cart count", CountPayload { count })))
}

/// Check every line against the catalog before checkout.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn validate(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<impl IntoResponse> {
    let (store, catalog) = (state.cart_store(), state.catalog());
    let validation = CartService::new(&store, &catalog)
        .validate_cart(&user_id)
        .await?;
    let message = if validation.valid {
        "Cart is ready for checkout"
    } else {
        "Cart has items that need attention"
    };
    Ok(Json(ApiResponse::ok(message, ValidationPayload { validation })))
}

/// Add units of a variant.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    body: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body?;
    let variant_id = VariantId::parse(&body.variant_id)?;
    let quantity = add_quantity(body.quantity)?;

    let (store, catalog) = (state.cart_store(), state.catalog());
    let row = CartService::new(&store, &catalog)
        .add_to_cart(&user_id, &variant_id, quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("variant_id", variant_id.as_str())]),
    );

    Ok(Json(ApiResponse::ok(
        "Item added to cart",
        CartItemPayload { item: Some(row) },
    )))
}

/// Set the quantity of a line; zero or less removes it.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    variant: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Path(variant) = variant?;
    let variant_id = VariantId::parse(&variant)?;
    let Json(body) = body?;

    let (store, catalog) = (state.cart_store(), state.catalog());
    let item = CartService::new(&store, &catalog)
        .update_cart_item(&user_id, &variant_id, body.quantity)
        .await?;
    let message = if item.is_some() {
        "Cart updated"
    } else {
        "Item removed from cart"
    };
    Ok(Json(ApiResponse::ok(message, CartItemPayload { item })))
}

/// Remove a line.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    variant: std::result::Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(variant) = variant?;
    let variant_id = VariantId::parse(&variant)?;

    let (store, catalog) = (state.cart_store(), state.catalog());
    let removed = CartService::new(&store, &catalog)
        .remove_from_cart(&user_id, &variant_id)
        .await?;
    let message = if removed {
        "Item removed from cart"
    } else {
        "Item was not in cart"
    };
    Ok(Json(ApiResponse::done(message)))
}
