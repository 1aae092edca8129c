//! Guest favorites service.
//!
//! Favorites are a set of product ids at `favorites:<session>`, expiring five
//! days after the last write.

use tracing::instrument;

use basket_core::{ProductId, SessionId};

use super::{ServiceError, keys};
use crate::kv::KvStore;

/// Guest favorites operations over the key-value store.
pub struct GuestFavoritesService<'a, K> {
    kv: &'a K,
}

impl<'a, K: KvStore> GuestFavoritesService<'a, K> {
    /// Create a new guest favorites service.
    #[must_use]
    pub const fn new(kv: &'a K) -> Self {
        Self { kv }
    }

    /// Add a product. Returns whether it was newly added.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    #[instrument(skip_all, fields(session_id = %session_id, product_id = %product_id))]
    pub async fn add_item(
        &self,
        session_id: &SessionId,
        product_id: &ProductId,
    ) -> Result<bool, ServiceError> {
        let key = keys::favorites(session_id);
        let added = self.kv.sadd(&key, product_id.as_str()).await?;
        self.kv.expire(&key, keys::GUEST_DATA_TTL).await?;
        Ok(added)
    }

    /// All favorited products, sorted by id.
    ///
    /// Members that are not valid product ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn get_favorites(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ProductId>, ServiceError> {
        let members = self.kv.smembers(&keys::favorites(session_id)).await?;
        let mut products: Vec<ProductId> = members
            .iter()
            .filter_map(|m| match ProductId::parse(m) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(member = %m, error = %e, "Skipping invalid guest favorite");
                    None
                }
            })
            .collect();
        products.sort();
        Ok(products)
    }

    /// Remove a product. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    #[instrument(skip_all, fields(session_id = %session_id, product_id = %product_id))]
    pub async fn remove_item(
        &self,
        session_id: &SessionId,
        product_id: &ProductId,
    ) -> Result<bool, ServiceError> {
        let key = keys::favorites(session_id);
        let removed = self.kv.srem(&key, product_id.as_str()).await?;
        self.kv.expire(&key, keys::GUEST_DATA_TTL).await?;
        Ok(removed)
    }

    /// Whether a product is in the guest's favorites.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    pub async fn is_in_favorites(
        &self,
        session_id: &SessionId,
        product_id: &ProductId,
    ) -> Result<bool, ServiceError> {
        Ok(self
            .kv
            .sismember(&keys::favorites(session_id), product_id.as_str())
            .await?)
    }

    /// Remove every favorite. Clearing an empty set is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn clear_favorites(&self, session_id: &SessionId) -> Result<(), ServiceError> {
        self.kv.del(&[&keys::favorites(session_id)]).await?;
        Ok(())
    }

    /// Number of favorites.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    pub async fn get_favorites_count(&self, session_id: &SessionId) -> Result<u64, ServiceError> {
        Ok(self.kv.scard(&keys::favorites(session_id)).await?)
    }
}
