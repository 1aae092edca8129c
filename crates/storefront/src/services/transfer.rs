//! Guest-to-user transfer.
//!
//! Runs once after login or registration: the guest session's cart and
//! favorites are merged into the user's rows and the guest copies removed.
//!
//! Each entity is merged inside its own database transaction. The guest
//! source is cleared only after that transaction commits, and a failed clear
//! does not fail the transfer: a retry may then merge the same cart twice,
//! but a committed merge is never lost. Cart and favorites are independent;
//! one may succeed while the other fails.

use tracing::instrument;

use basket_core::{SessionId, UserId};

use super::{GuestCartService, GuestFavoritesService, ServiceError, keys};
use crate::db::{CartStore, CartTransaction};
use crate::kv::KvStore;
use crate::models::{MergeOutcome, TransferEntity, TransferReport, TransferSummary};

/// Merges guest state from the key-value store into persistent rows.
pub struct TransferService<'a, K, S> {
    kv: &'a K,
    store: &'a S,
}

impl<'a, K: KvStore, S: CartStore> TransferService<'a, K, S> {
    /// Create a new transfer service.
    #[must_use]
    pub const fn new(kv: &'a K, store: &'a S) -> Self {
        Self { kv, store }
    }

    /// Merge the guest cart into the user's cart.
    ///
    /// Quantities add to any the user already has. An empty guest cart opens
    /// no transaction.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::TransferInProgress` if the session's cart is
    /// already being transferred, or the store/repository error that aborted
    /// the merge. On error nothing was written and the guest cart is intact.
    #[instrument(skip_all, fields(session_id = %session_id, user_id = %user_id))]
    pub async fn transfer_cart(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<TransferSummary, ServiceError> {
        let entity = TransferEntity::Cart;
        self.acquire_lock(entity, session_id).await?;
        let result = self.merge_cart(session_id, user_id).await;
        self.release_lock(entity, session_id).await;
        log_result(&result);
        result
    }

    /// Merge the guest favorites into the user's favorites, skipping products
    /// the user already has.
    ///
    /// # Errors
    ///
    /// As [`TransferService::transfer_cart`].
    #[instrument(skip_all, fields(session_id = %session_id, user_id = %user_id))]
    pub async fn transfer_favorites(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<TransferSummary, ServiceError> {
        let entity = TransferEntity::Favorites;
        self.acquire_lock(entity, session_id).await?;
        let result = self.merge_favorites(session_id, user_id).await;
        self.release_lock(entity, session_id).await;
        log_result(&result);
        result
    }

    /// Transfer cart and favorites independently.
    ///
    /// Both halves always run; [`TransferReport::success`] is true only if
    /// both succeeded.
    #[instrument(skip_all, fields(session_id = %session_id, user_id = %user_id))]
    pub async fn transfer_all(&self, session_id: &SessionId, user_id: &UserId) -> TransferReport {
        let cart = self.transfer_cart(session_id, user_id).await;
        let favorites = self.transfer_favorites(session_id, user_id).await;
        let report = TransferReport { cart, favorites };
        tracing::info!(success = report.success(), "Guest transfer finished");
        report
    }

    async fn merge_cart(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<TransferSummary, ServiceError> {
        let guest = GuestCartService::new(self.kv);
        let items = guest.get_cart(session_id).await?;
        if items.is_empty() {
            return Ok(TransferSummary::nothing(TransferEntity::Cart));
        }

        let mut tx = self.store.begin().await?;
        let mut outcomes = Vec::with_capacity(items.len());
        for item in &items {
            match tx
                .merge_cart_item(user_id, &item.variant_id, item.quantity)
                .await
            {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::warn!(variant_id = %item.variant_id, error = %e, "Cart merge failed, rolling back");
                    rollback(tx).await;
                    return Err(e.into());
                }
            }
        }
        tx.commit().await?;

        let mut summary = TransferSummary::from_outcomes(TransferEntity::Cart, &outcomes);
        summary.source_cleared = match guest.clear_cart(session_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Cart merged but guest cart could not be cleared");
                false
            }
        };
        Ok(summary)
    }

    async fn merge_favorites(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<TransferSummary, ServiceError> {
        let guest = GuestFavoritesService::new(self.kv);
        let products = guest.get_favorites(session_id).await?;
        if products.is_empty() {
            return Ok(TransferSummary::nothing(TransferEntity::Favorites));
        }

        let mut tx = self.store.begin().await?;
        let mut outcomes: Vec<MergeOutcome> = Vec::with_capacity(products.len());
        for product_id in &products {
            match tx.insert_favorite_if_absent(user_id, product_id).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::warn!(product_id = %product_id, error = %e, "Favorite merge failed, rolling back");
                    rollback(tx).await;
                    return Err(e.into());
                }
            }
        }
        tx.commit().await?;

        let mut summary = TransferSummary::from_outcomes(TransferEntity::Favorites, &outcomes);
        summary.source_cleared = match guest.clear_favorites(session_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Favorites merged but guest favorites could not be cleared");
                false
            }
        };
        Ok(summary)
    }

    async fn acquire_lock(
        &self,
        entity: TransferEntity,
        session_id: &SessionId,
    ) -> Result<(), ServiceError> {
        let acquired = self
            .kv
            .set_nx_ex(
                &keys::transfer_lock(entity, session_id),
                "1",
                keys::TRANSFER_LOCK_TTL,
            )
            .await?;
        if acquired {
            Ok(())
        } else {
            tracing::info!(entity = %entity, "Transfer already in progress");
            Err(ServiceError::TransferInProgress)
        }
    }

    async fn release_lock(&self, entity: TransferEntity, session_id: &SessionId) {
        // the lock also expires on its own
        if let Err(e) = self
            .kv
            .del(&[&keys::transfer_lock(entity, session_id)])
            .await
        {
            tracing::warn!(entity = %entity, error = %e, "Failed to release transfer lock");
        }
    }
}

async fn rollback<T: CartTransaction>(tx: T) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(error = %e, "Rollback failed");
    }
}

fn log_result(result: &Result<TransferSummary, ServiceError>) {
    match result {
        Ok(summary) => tracing::info!(
            entity = %summary.entity,
            total = summary.total,
            inserted = summary.inserted,
            existing = summary.existing,
            source_cleared = summary.source_cleared,
            "Transfer committed"
        ),
        Err(ServiceError::TransferInProgress) => {}
        Err(e) => tracing::error!(error = %e, "Transfer failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryCartStore;
    use crate::kv::MemoryStore;
    use basket_core::{ProductId, VariantId};

    fn sid() -> SessionId {
        SessionId::parse("guest_abc_1").unwrap()
    }

    fn user() -> UserId {
        UserId::parse("user-42").unwrap()
    }

    fn variant(id: &str) -> VariantId {
        VariantId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_empty_cart_opens_no_transaction() {
        let kv = MemoryStore::new();
        let store = MemoryCartStore::new();
        store.set_offline(true);

        let summary = TransferService::new(&kv, &store)
            .transfer_cart(&sid(), &user())
            .await
            .unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.message(), "No cart items to transfer");
    }

    #[tokio::test]
    async fn test_lock_is_released_after_transfer() {
        let kv = MemoryStore::new();
        let store = MemoryCartStore::new();
        GuestCartService::new(&kv)
            .add_item(&sid(), &variant("v1"), 1)
            .await
            .unwrap();

        let transfer = TransferService::new(&kv, &store);
        transfer.transfer_cart(&sid(), &user()).await.unwrap();
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn test_held_lock_rejects_transfer() {
        let kv = MemoryStore::new();
        let store = MemoryCartStore::new();
        kv.set_nx_ex(
            &keys::transfer_lock(TransferEntity::Favorites, &sid()),
            "1",
            keys::TRANSFER_LOCK_TTL,
        )
        .await
        .unwrap();
        GuestFavoritesService::new(&kv)
            .add_item(&sid(), &ProductId::parse("p1").unwrap())
            .await
            .unwrap();

        let result = TransferService::new(&kv, &store)
            .transfer_favorites(&sid(), &user())
            .await;
        assert!(matches!(result, Err(ServiceError::TransferInProgress)));
        assert_eq!(store.favorite_count(&user()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_begin_keeps_guest_cart() {
        let kv = MemoryStore::new();
        let store = MemoryCartStore::new();
        let guest = GuestCartService::new(&kv);
        guest.add_item(&sid(), &variant("v1"), 2).await.unwrap();
        store.set_offline(true);

        let result = TransferService::new(&kv, &store)
            .transfer_cart(&sid(), &user())
            .await;
        assert!(matches!(result, Err(ServiceError::Repository(_))));
        assert_eq!(guest.get_cart_count(&sid()).await.unwrap(), 2);
    }
}
