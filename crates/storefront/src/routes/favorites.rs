//! Signed-in user's favorites.

use axum::{
    Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    response::IntoResponse,
};
use basket_core::ProductId;
use serde::Serialize;
use tracing::instrument;

use super::{CountPayload, FavoriteRequest, MembershipPayload};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{ApiResponse, FavoriteRow};
use crate::services::FavoritesService;
use crate::state::AppState;

/// Payload for the favorites list.
#[derive(Debug, Serialize)]
pub struct FavoritesPayload {
    pub favorites: Vec<FavoriteRow>,
    pub count: usize,
}

/// List favorites, oldest first.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<impl IntoResponse> {
    let store = state.cart_store();
    let favorites = FavoritesService::new(&store)
        .get_favorites(&user_id)
        .await?;
    let count = favorites.len();
    Ok(Json(ApiResponse::ok(
        "Favorites retrieved",
        FavoritesPayload { favorites, count },
    )))
}

/// Add a product to favorites.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    body: std::result::Result<Json<FavoriteRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body?;
    let product_id = ProductId::parse(&body.product_id)?;

    let store = state.cart_store();
    let added = FavoritesService::new(&store)
        .add_favorite(&user_id, &product_id)
        .await?;
    let message = if added {
        "Added to favorites"
    } else {
        "Already in favorites"
    };
    Ok(Json(ApiResponse::ok(
        message,
        MembershipPayload {
            product_id,
            is_favorite: true,
        },
    )))
}

/// Number of favorites.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn count(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<impl IntoResponse> {
    let store = state.cart_store();
    let count = FavoritesService::new(&store)
        .get_favorites_count(&user_id)
        .await?;
    Ok(Json(ApiResponse::ok("Favorites count", CountPayload { count })))
}

/// Whether a product is a favorite.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    product: std::result::Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(product) = product?;
    let product_id = ProductId::parse(&product)?;

    let store = state.cart_store();
    let is_favorite = FavoritesService::new(&store)
        .is_favorite(&user_id, &product_id)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Favorite status",
        MembershipPayload {
            product_id,
            is_favorite,
        },
    )))
}

/// Remove a product from favorites.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    product: std::result::Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(product) = product?;
    let product_id = ProductId::parse(&product)?;

    let store = state.cart_store();
    let removed = FavoritesService::new(&store)
        .remove_favorite(&user_id, &product_id)
        .await?;
    let message = if removed {
        "Removed from favorites"
    } else {
        "Product was not in favorites"
    };
    Ok(Json(ApiResponse::ok(
        message,
        MembershipPayload {
            product_id,
            is_favorite: false,
        },
    )))
}
