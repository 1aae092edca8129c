//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Every error renders as the JSON envelope `{ "success": false, "message": ... }`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ApiResponse;
use crate::services::ServiceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Service operation failed.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Repository(RepositoryError::Conflict(_))
                | ServiceError::Unavailable { .. }
                | ServiceError::TransferInProgress => StatusCode::CONFLICT,
                ServiceError::ItemNotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Repository(RepositoryError::QuantityOutOfRange(_))
                | ServiceError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                ServiceError::Repository(_) | ServiceError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    // Don't expose internal error details to clients
    fn public_message(&self) -> String {
        match self {
            Self::Service(err) => match err {
                ServiceError::Store(_) => "Saved items are temporarily unavailable".to_string(),
                ServiceError::Repository(RepositoryError::Conflict(_)) => {
                    "Item no longer exists".to_string()
                }
                ServiceError::Repository(RepositoryError::QuantityOutOfRange(q)) => {
                    format!("Invalid quantity: {q}")
                }
                ServiceError::Repository(_) | ServiceError::Serialization(_) => {
                    "Internal server error".to_string()
                }
                ServiceError::InvalidQuantity(q) => format!("Invalid quantity: {q}"),
                ServiceError::Unavailable { requested, .. } => {
                    format!("Requested quantity ({requested}) is not available")
                }
                ServiceError::ItemNotFound(_) => "Item not found in cart".to_string(),
                ServiceError::TransferInProgress => {
                    "Your saved items are already being restored".to_string()
                }
            },
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(ApiResponse::error(self.public_message()))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<basket_core::IdError> for AppError {
    fn from(err: basket_core::IdError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this once the auth gateway has identified the user.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to guest cart", Some(&[("variant_id", "v1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kv::KvError;
    use basket_core::VariantId;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Unauthorized("missing x-user-id".to_string());
        assert_eq!(err.to_string(), "Unauthorized: missing x-user-id");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_error_status_codes() {
        assert_eq!(
            get_status(ServiceError::Store(KvError::Unavailable("down".to_string()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(ServiceError::Repository(RepositoryError::Database(
                sqlx::Error::PoolTimedOut
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(ServiceError::InvalidQuantity(0)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ServiceError::ItemNotFound("v1".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ServiceError::Unavailable {
                variant_id: VariantId::parse("v1").unwrap(),
                requested: 3,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ServiceError::TransferInProgress),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ServiceError::Repository(RepositoryError::QuantityOutOfRange(
                u32::MAX
            ))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::from(ServiceError::Repository(RepositoryError::DataCorruption(
            "cart_item.quantity = -4".to_string(),
        )));
        assert_eq!(err.public_message(), "Internal server error");
    }
}
