//! User identification.
//!
//! Authentication happens in the gateway in front of this service, which
//! forwards the signed-in user's id in a trusted header (by default
//! `x-user-id`, see `STOREFRONT_USER_HEADER`).

use axum::{extract::FromRequestParts, http::request::Parts};
use basket_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// Rejects with `401 Unauthorized` when the header is missing or does not hold
/// a valid user id.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user_id): RequireUser) -> impl IntoResponse {
///     format!("Hello, {user_id}!")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireUser(pub UserId);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = &state.config().user_header;
        let raw = parts
            .headers
            .get(header)
            .ok_or_else(|| AppError::Unauthorized("missing user header".to_owned()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("user header is not text".to_owned()))?;

        let user_id = UserId::parse(raw.trim())
            .map_err(|e| AppError::Unauthorized(format!("invalid user id: {e}")))?;

        tracing::Span::current().record("user_id", user_id.as_str());
        set_sentry_user(&user_id);

        Ok(Self(user_id))
    }
}
