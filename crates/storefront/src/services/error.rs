//! Service error types.

use thiserror::Error;

use basket_core::VariantId;

use crate::db::RepositoryError;
use crate::kv::KvError;

/// Errors returned by the cart, favorites, session and transfer services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Key-value store failure.
    #[error("key-value store error: {0}")]
    Store(#[from] KvError),

    /// Database failure.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Quantity outside the accepted range.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// The catalog cannot supply the requested quantity.
    #[error("variant {variant_id} is unavailable in quantity {requested}")]
    Unavailable {
        /// Variant that was requested.
        variant_id: VariantId,
        /// Total quantity that would have been in the cart.
        requested: u32,
    },

    /// The cart row to update does not exist.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Another transfer of the same guest session is running.
    #[error("transfer already in progress")]
    TransferInProgress,

    /// A session record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
