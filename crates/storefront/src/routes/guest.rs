//! Guest cart, favorites and session handlers.
//!
//! Read endpoints answer with empty data when the caller has no session.
//! Write endpoints start a session on demand and set the `np_guest` cookie.

use axum::{
    Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    response::IntoResponse,
};
use basket_core::{ProductId, VariantId};
use serde::Serialize;
use tracing::instrument;

use super::{
    AddItemRequest, CountPayload, FavoriteRequest, MembershipPayload, UpdateItemRequest,
    add_quantity,
};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::GuestSession;
use crate::middleware::guest::expired_cookie;
use crate::models::{ApiResponse, GuestCartItem};
use crate::services::{GuestCartService, GuestFavoritesService, SessionService};
use crate::state::AppState;

/// Payload for session endpoints.
#[derive(Debug, Serialize)]
pub struct SessionPayload {
    pub session_id: String,
}

/// Payload for the guest cart.
#[derive(Debug, Serialize)]
pub struct GuestCartPayload {
    pub items: Vec<GuestCartItem>,
    pub item_count: u64,
}

/// Payload for a single guest cart entry; `item` is null once removed.
#[derive(Debug, Serialize)]
pub struct GuestItemPayload {
    pub item: Option<GuestCartItem>,
}

/// Payload for guest favorites.
#[derive(Debug, Serialize)]
pub struct GuestFavoritesPayload {
    pub product_ids: Vec<ProductId>,
    pub count: usize,
}

/// Start a guest session, or confirm the existing one.
#[instrument(skip_all)]
pub async fn start_session(
    State(state): State<AppState>,
    session: GuestSession,
) -> Result<impl IntoResponse> {
    let started = session.0.is_none();
    let (session_id, cookie) = session.ensure(&state).await?;
    let message = if started {
        "Guest session started"
    } else {
        "Guest session active"
    };
    Ok((
        cookie,
        Json(ApiResponse::ok(
            message,
            SessionPayload {
                session_id: session_id.to_string(),
            },
        )),
    ))
}

/// End a guest session: delete its record, cart and favorites, and expire the cookie.
#[instrument(skip_all)]
pub async fn end_session(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
) -> Result<impl IntoResponse> {
    if let Some(session_id) = &session {
        GuestCartService::new(state.kv())
            .clear_cart(session_id)
            .await?;
        GuestFavoritesService::new(state.kv())
            .clear_favorites(session_id)
            .await?;
        SessionService::new(state.kv())
            .delete_session(session_id)
            .await?;
    }
    let cookie = expired_cookie(state.config().secure_cookies())?;
    Ok((cookie, Json(ApiResponse::done("Guest session ended"))))
}

/// Show the guest cart.
#[instrument(skip_all)]
pub async fn show_cart(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
) -> Result<impl IntoResponse> {
    let items = match &session {
        Some(session_id) => GuestCartService::new(state.kv()).get_cart(session_id).await?,
        None => Vec::new(),
    };
    let item_count = items.iter().map(|item| u64::from(item.quantity)).sum();
    Ok(Json(ApiResponse::ok(
        "Cart retrieved",
        GuestCartPayload { items, item_count },
    )))
}

/// Clear the guest cart.
#[instrument(skip_all)]
pub async fn clear_cart(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
) -> Result<impl IntoResponse> {
    if let Some(session_id) = &session {
        GuestCartService::new(state.kv())
            .clear_cart(session_id)
            .await?;
    }
    Ok(Json(ApiResponse::done("Cart cleared")))
}

/// Total units in the guest cart.
#[instrument(skip_all)]
pub async fn cart_count(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
) -> Result<impl IntoResponse> {
    let count = match &session {
        Some(session_id) => {
            GuestCartService::new(state.kv())
                .get_cart_count(session_id)
                .await?
        }
        None => 0,
    };
    Ok(Json(ApiResponse::ok("Cart count", CountPayload { count })))
}

/// Add units of a variant to the guest cart.
#[instrument(skip_all)]
pub async fn add_item(
    State(state): State<AppState>,
    session: GuestSession,
    body: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body?;
    let variant_id = VariantId::parse(&body.variant_id)?;
    let quantity = add_quantity(body.quantity)?;

    let (session_id, cookie) = session.ensure(&state).await?;
    let item = GuestCartService::new(state.kv())
        .add_item(&session_id, &variant_id, quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Added to guest cart",
        Some(&[("variant_id", variant_id.as_str())]),
    );

    Ok((
        cookie,
        Json(ApiResponse::ok(
            "Item added to cart",
            GuestItemPayload { item: Some(item) },
        )),
    ))
}

/// Set the quantity of a guest cart entry; zero or less removes it.
#[instrument(skip_all)]
pub async fn update_item(
    State(state): State<AppState>,
    session: GuestSession,
    variant: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Path(variant) = variant?;
    let variant_id = VariantId::parse(&variant)?;
    let Json(body) = body?;

    let (session_id, cookie) = session.ensure(&state).await?;
    let item = GuestCartService::new(state.kv())
        .update_quantity(&session_id, &variant_id, body.quantity)
        .await?;
    let message = if item.is_some() {
        "Cart updated"
    } else {
        "Item removed from cart"
    };

    Ok((cookie, Json(ApiResponse::ok(message, GuestItemPayload { item }))))
}

/// Remove a variant from the guest cart.
#[instrument(skip_all)]
pub async fn remove_item(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
    variant: std::result::Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(variant) = variant?;
    let variant_id = VariantId::parse(&variant)?;
    let removed = match &session {
        Some(session_id) => {
            GuestCartService::new(state.kv())
                .remove_item(session_id, &variant_id)
                .await?
        }
        None => false,
    };
    let message = if removed {
        "Item removed from cart"
    } else {
        "Item was not in cart"
    };
    Ok(Json(ApiResponse::done(message)))
}

/// List guest favorites.
#[instrument(skip_all)]
pub async fn list_favorites(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
) -> Result<impl IntoResponse> {
    let product_ids = match &session {
        Some(session_id) => {
            GuestFavoritesService::new(state.kv())
                .get_favorites(session_id)
                .await?
        }
        None => Vec::new(),
    };
    let count = product_ids.len();
    Ok(Json(ApiResponse::ok(
        "Favorites retrieved",
        GuestFavoritesPayload { product_ids, count },
    )))
}

/// Clear guest favorites.
#[instrument(skip_all)]
pub async fn clear_favorites(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
) -> Result<impl IntoResponse> {
    if let Some(session_id) = &session {
        GuestFavoritesService::new(state.kv())
            .clear_favorites(session_id)
            .await?;
    }
    Ok(Json(ApiResponse::done("Favorites cleared")))
}

/// Number of guest favorites.
#[instrument(skip_all)]
pub async fn favorites_count(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
) -> Result<impl IntoResponse> {
    let count = match &session {
        Some(session_id) => {
            GuestFavoritesService::new(state.kv())
                .get_favorites_count(session_id)
                .await?
        }
        None => 0,
    };
    Ok(Json(ApiResponse::ok("Favorites count", CountPayload { count })))
}

/// Add a product to guest favorites.
#[instrument(skip_all)]
pub async fn add_favorite(
    State(state): State<AppState>,
    session: GuestSession,
    body: std::result::Result<Json<FavoriteRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body?;
    let product_id = ProductId::parse(&body.product_id)?;

    let (session_id, cookie) = session.ensure(&state).await?;
    let added = GuestFavoritesService::new(state.kv())
        .add_item(&session_id, &product_id)
        .await?;
    let message = if added {
        "Added to favorites"
    } else {
        "Already in favorites"
    };

    Ok((
        cookie,
        Json(ApiResponse::ok(
            message,
            MembershipPayload {
                product_id,
                is_favorite: true,
            },
        )),
    ))
}

/// Whether a product is in guest favorites.
#[instrument(skip_all)]
pub async fn is_favorite(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
    product: std::result::Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(product) = product?;
    let product_id = ProductId::parse(&product)?;
    let is_favorite = match &session {
        Some(session_id) => {
            GuestFavoritesService::new(state.kv())
                .is_in_favorites(session_id, &product_id)
                .await?
        }
        None => false,
    };
    Ok(Json(ApiResponse::ok(
        "Favorite status",
        MembershipPayload {
            product_id,
            is_favorite,
        },
    )))
}

/// Remove a product from guest favorites.
#[instrument(skip_all)]
pub async fn remove_favorite(
    State(state): State<AppState>,
    GuestSession(session): GuestSession,
    product: std::result::Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(product) = product?;
    let product_id = ProductId::parse(&product)?;
    let removed = match &session {
        Some(session_id) => {
            GuestFavoritesService::new(state.kv())
                .remove_item(session_id, &product_id)
                .await?
        }
        None => false,
    };
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
