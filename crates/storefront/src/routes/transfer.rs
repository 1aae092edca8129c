//! Guest-to-user transfer at login.
//!
//! Always answers `200 OK`: a failed transfer must never block the login
//! that triggered it. The body reports each half separately.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::guest::{SetCookie, expired_cookie};
use crate::middleware::{GuestSession, RequireUser};
use crate::models::{ApiResponse, TransferReport, TransferSummary};
use crate::services::{ServiceError, SessionService, TransferService};
use crate::state::AppState;

/// Outcome of one half of a transfer.
#[derive(Debug, Serialize)]
pub struct TransferHalf {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TransferSummary>,
}

impl TransferHalf {
    fn from_result(result: &std::result::Result<TransferSummary, ServiceError>) -> Self {
        match result {
            Ok(summary) => Self {
                success: true,
                message: summary.message(),
                summary: Some(summary.clone()),
            },
            Err(ServiceError::TransferInProgress) => Self {
                success: false,
                message: "Transfer already in progress".to_owned(),
                summary: None,
            },
            Err(_) => Self {
                success: false,
                message: "Transfer failed".to_owned(),
                summary: None,
            },
        }
    }
}

/// Payload of a transfer response.
#[derive(Debug, Serialize)]
pub struct TransferPayload {
    pub cart: TransferHalf,
    pub favorites: TransferHalf,
}

impl From<&TransferReport> for TransferPayload {
    fn from(report: &TransferReport) -> Self {
        Self {
            cart: TransferHalf::from_result(&report.cart),
            favorites: TransferHalf::from_result(&report.favorites),
        }
    }
}

/// Merge the caller's guest cart and favorites into their account.
///
/// On full success the guest session record is deleted and the cookie
/// expired. Without a guest session there is nothing to do.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn transfer(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    GuestSession(session): GuestSession,
) -> Result<impl IntoResponse> {
    let Some(session_id) = session else {
        return Ok((
            None::<SetCookie>,
            Json(ApiResponse::done("No guest session to transfer")).into_response(),
        ));
    };

    let store = state.cart_store();
    let report = TransferService::new(state.kv(), &store)
        .transfer_all(&session_id, &user_id)
        .await;
    let payload = TransferPayload::from(&report);

    if !report.success() {
        tracing::warn!(session_id = %session_id, "Guest transfer incomplete");
        return Ok((
            None,
            Json(ApiResponse::failed(report.message(), payload)).into_response(),
        ));
    }

    if let Err(e) = SessionService::new(state.kv())
        .delete_session(&session_id)
        .await
    {
        tracing::warn!(session_id = %session_id, error = %e, "Failed to delete guest session after transfer");
    }
    let cookie = expired_cookie(state.config().secure_cookies())?;

    Ok((
        Some(cookie),
        Json(ApiResponse::ok(report.message(), payload)).into_response(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kv::KvError;
    use crate::models::TransferEntity;

    #[test]
    fn test_payload_hides_internal_errors() {
        let report = TransferReport {
            cart: Ok(TransferSummary::nothing(TransferEntity::Cart)),
            favorites: Err(ServiceError::Store(KvError::Unavailable(
                "10.0.0.7:6379 refused".to_owned(),
            ))),
        };
        let json = serde_json::to_value(TransferPayload::from(&report)).unwrap();

        assert_eq!(json["cart"]["success"], true);
        assert_eq!(json["cart"]["message"], "No cart items to transfer");
        assert_eq!(json["favorites"]["success"], false);
        assert_eq!(json["favorites"]["message"], "Transfer failed");
        assert!(json["favorites"].get("summary").is_none());
    }

    #[test]
    fn test_payload_reports_lock_contention() {
        let report = TransferReport {
            cart: Err(ServiceError::TransferInProgress),
            favorites: Ok(TransferSummary::nothing(TransferEntity::Favorites)),
        };
        let payload = TransferPayload::from(&report);
        assert_eq!(payload.cart.message, "Transfer already in progress");
        assert!(payload.favorites.success);
    }
}
