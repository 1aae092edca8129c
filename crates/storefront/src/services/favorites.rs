//! Signed-in user's favorites.

use tracing::instrument;

use basket_core::{ProductId, UserId};

use super::ServiceError;
use crate::db::CartStore;
use crate::models::FavoriteRow;

/// Favorites operations over persistent rows.
pub struct FavoritesService<'a, S> {
    store: &'a S,
}

impl<'a, S: CartStore> FavoritesService<'a, S> {
    /// Create a new favorites service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Favorite a product. Returns whether a row was inserted.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure or for an
    /// unknown product.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, ServiceError> {
        Ok(self.store.add_favorite(user_id, product_id).await?)
    }

    /// The user's favorites, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    pub async fn get_favorites(&self, user_id: &UserId) -> Result<Vec<FavoriteRow>, ServiceError> {
        Ok(self.store.favorites(user_id).await?)
    }

    /// Unfavorite a product. Returns whether it was favorited.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, ServiceError> {
        Ok(self.store.remove_favorite(user_id, product_id).await?)
    }

    /// Whether the user has favorited a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    pub async fn is_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, ServiceError> {
        Ok(self.store.is_favorite(user_id, product_id).await?)
    }

    /// Number of favorites.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    pub async fn get_favorites_count(&self, user_id: &UserId) -> Result<u64, ServiceError> {
        Ok(self.store.favorite_count(user_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryCartStore;

    #[tokio::test]
    async fn test_add_dedups_and_counts() {
        let store = MemoryCartStore::new();
        let favorites = FavoritesService::new(&store);
        let user = UserId::parse("user-42").unwrap();
        let product = ProductId::parse("p1").unwrap();

        assert!(favorites.add_favorite(&user, &product).await.unwrap());
        assert!(!favorites.add_favorite(&user, &product).await.unwrap());
        assert_eq!(favorites.get_favorites_count(&user).await.unwrap(), 1);
        assert!(favorites.is_favorite(&user, &product).await.unwrap());

        assert!(favorites.remove_favorite(&user, &product).await.unwrap());
        assert!(favorites.get_favorites(&user).await.unwrap().is_empty());
    }
}
