//! Signed-in user's cart.

use tracing::instrument;

use basket_core::{MAX_LINE_QUANTITY, UserId, VariantId};

use super::ServiceError;
use crate::db::{CartStore, Catalog};
use crate::models::{CartRow, CartSummary, CartValidation};

/// Cart operations over persistent rows, checked against the catalog.
pub struct CartService<'a, S, C> {
    store: &'a S,
    catalog: &'a C,
}

impl<'a, S: CartStore, C: Catalog> CartService<'a, S, C> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a S, catalog: &'a C) -> Self {
        Self { store, catalog }
    }

    /// Add `quantity` units of a variant to the user's cart.
    ///
    /// Availability is checked against the merged total, so adding one more
    /// unit to a line already at the stock limit fails.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidQuantity` for zero or a line total above
    /// [`MAX_LINE_QUANTITY`], `ServiceError::Unavailable` if the catalog cannot supply the total, or
    /// `ServiceError::Repository` on database failure.
    #[instrument(skip_all, fields(user_id = %user_id, variant_id = %variant_id, quantity = quantity))]
    pub async fn add_to_cart(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<CartRow, ServiceError> {
        if quantity == 0 {
            return Err(ServiceError::InvalidQuantity(0));
        }

        let current = self
            .store
            .cart_item(user_id, variant_id)
            .await?
            .map_or(0, |row| row.quantity());
        let total = i64::from(current) + i64::from(quantity);
        let requested = u32::try_from(total)
            .ok()
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or(ServiceError::InvalidQuantity(total))?;
        self.ensure_available(variant_id, requested).await?;

        Ok(self
            .store
            .add_cart_quantity(user_id, variant_id, quantity)
            .await?)
    }

    /// The user's cart, priced and joined against the catalog.
    ///
    /// Lines whose product or variant is inactive or gone are left out.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<CartSummary, ServiceError> {
        let rows = self.store.cart_items(user_id).await?;
        if rows.is_empty() {
            return Ok(CartSummary::empty());
        }
        let ids: Vec<VariantId> = rows.iter().map(|r| r.variant_id.clone()).collect();
        let details = self.catalog.variant_details(&ids).await?;
        Ok(CartSummary::build(&rows, &details))
    }

    /// Set a line's quantity outright. Zero or less removes the line.
    ///
    /// Returns the updated row, or `None` when the line was removed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ItemNotFound` if the user has no such line,
    /// `ServiceError::Unavailable` if the catalog cannot supply the quantity,
    /// `ServiceError::InvalidQuantity` for quantities above
    /// [`MAX_LINE_QUANTITY`], or
    /// `ServiceError::Repository` on database failure.
    #[instrument(skip_all, fields(user_id = %user_id, variant_id = %variant_id, quantity = quantity))]
    pub async fn update_cart_item(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: i64,
    ) -> Result<Option<CartRow>, ServiceError> {
        if quantity <= 0 {
            return if self.store.remove_cart_item(user_id, variant_id).await? {
                Ok(None)
            } else {
                Err(ServiceError::ItemNotFound(variant_id.to_string()))
            };
        }
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or(ServiceError::InvalidQuantity(quantity))?;
        if self.store.cart_item(user_id, variant_id).await?.is_none() {
            return Err(ServiceError::ItemNotFound(variant_id.to_string()));
        }
        self.ensure_available(variant_id, quantity).await?;

        self.store
            .set_cart_quantity(user_id, variant_id, quantity)
            .await?
            .map(Some)
            .ok_or_else(|| ServiceError::ItemNotFound(variant_id.to_string()))
    }

    /// Remove a line. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    #[instrument(skip_all, fields(user_id = %user_id, variant_id = %variant_id))]
    pub async fn remove_from_cart(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
    ) -> Result<bool, ServiceError> {
        Ok(self.store.remove_cart_item(user_id, variant_id).await?)
    }

    /// Remove every line. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: &UserId) -> Result<u64, ServiceError> {
        Ok(self.store.clear_cart(user_id).await?)
    }

    /// Total units in the cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    pub async fn get_cart_item_count(&self, user_id: &UserId) -> Result<u64, ServiceError> {
        Ok(self.store.cart_count(user_id).await?)
    }

    /// Check every line against the catalog before checkout.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on database failure.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn validate_cart(&self, user_id: &UserId) -> Result<CartValidation, ServiceError> {
        let rows = self.store.cart_items(user_id).await?;
        let ids: Vec<VariantId> = rows.iter().map(|r| r.variant_id.clone()).collect();
        let details = self.catalog.variant_details(&ids).await?;
        let validation = CartValidation::evaluate(&rows, &details);
        if !validation.valid {
            tracing::info!(issues = validation.issues.len(), "Cart failed validation");
        }
        Ok(validation)
    }

    async fn ensure_available(
        &self,
        variant_id: &VariantId,
        requested: u32,
    ) -> Result<(), ServiceError> {
        if self.catalog.check_availability(variant_id, requested).await? {
            Ok(())
        } else {
            Err(ServiceError::Unavailable {
                variant_id: variant_id.clone(),
                requested,
            })
        }
    }
}
