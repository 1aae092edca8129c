//! In-process [`CartStore`] and [`Catalog`] for tests and local development.
//!
//! Transactions stage their writes and apply them on commit, so a failure
//! part-way through leaves the committed rows untouched. Faults can be
//! injected with [`MemoryCartStore::set_offline`] and
//! [`MemoryCartStore::fail_merge_on`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use basket_core::{ProductId, UserId, VariantId};

use super::{CartStore, CartTransaction, Catalog, RepositoryError};
use crate::models::{CartRow, FavoriteRow, MergeOutcome, VariantDetails};

fn db_quantity(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity).map_err(|_| RepositoryError::QuantityOutOfRange(quantity))
}

fn injected_failure() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Debug, Default)]
struct Tables {
    cart: DashMap<(UserId, VariantId), CartRow>,
    favorites: DashMap<(UserId, ProductId), FavoriteRow>,
    offline: AtomicBool,
    /// 1-based merge call that fails; 0 disables.
    fail_merge_on: AtomicUsize,
    merges: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// Process-local cart and favorite rows.
///
/// Cloning shares the underlying tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    tables: Arc<Tables>,
}

impl MemoryCartStore {
    /// Create empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again when `false`).
    pub fn set_offline(&self, offline: bool) {
        self.tables.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the `n`th transactional merge from now on (1-based); `0` disables.
    pub fn fail_merge_on(&self, n: usize) {
        self.tables.merges.store(0, Ordering::SeqCst);
        self.tables.fail_merge_on.store(n, Ordering::SeqCst);
    }

    /// Number of committed transactions.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.tables.commits.load(Ordering::SeqCst)
    }

    /// Number of explicitly rolled back transactions.
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.tables.rollbacks.load(Ordering::SeqCst)
    }

    /// Committed quantity for a cart row.
    #[must_use]
    pub fn quantity(&self, user_id: &UserId, variant_id: &VariantId) -> Option<i32> {
        self.tables
            .cart
            .get(&(user_id.clone(), variant_id.clone()))
            .map(|row| row.quantity)
    }

    /// Number of committed favorite rows for `(user, product)`: 0 or 1.
    #[must_use]
    pub fn favorite_rows(&self, user_id: &UserId, product_id: &ProductId) -> usize {
        usize::from(
            self.tables
                .favorites
                .contains_key(&(user_id.clone(), product_id.clone())),
        )
    }

    fn check_online(&self) -> Result<(), RepositoryError> {
        if self.tables.offline.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }

    fn add_committed(&self, user_id: &UserId, variant_id: &VariantId, quantity: i32) -> CartRow {
        let now = Utc::now();
        self.tables
            .cart
            .entry((user_id.clone(), variant_id.clone()))
            .and_modify(|row| {
                row.quantity += quantity;
                row.updated_at = now;
            })
            .or_insert_with(|| CartRow {
                user_id: user_id.clone(),
                variant_id: variant_id.clone(),
                quantity,
                added_at: now,
                updated_at: now,
            })
            .clone()
    }

    fn insert_favorite_committed(&self, user_id: &UserId, product_id: &ProductId) -> bool {
        match self
            .tables
            .favorites
            .entry((user_id.clone(), product_id.clone()))
        {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(FavoriteRow {
                    user_id: user_id.clone(),
                    product_id: product_id.clone(),
                    created_at: Utc::now(),
                });
                true
            }
        }
    }
}

impl CartStore for MemoryCartStore {
    type Transaction = MemoryCartTransaction;

    async fn begin(&self) -> Result<MemoryCartTransaction, RepositoryError> {
        self.check_online()?;
        Ok(MemoryCartTransaction {
            store: self.clone(),
            staged: Vec::new(),
        })
    }

    async fn cart_items(&self, user_id: &UserId) -> Result<Vec<CartRow>, RepositoryError> {
        self.check_online()?;
        let mut rows: Vec<CartRow> = self
            .tables
            .cart
            .iter()
            .filter(|e| &e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.variant_id.cmp(&b.variant_id))
        });
        Ok(rows)
    }

    async fn cart_item(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
    ) -> Result<Option<CartRow>, RepositoryError> {
        self.check_online()?;
        Ok(self
            .tables
            .cart
            .get(&(user_id.clone(), variant_id.clone()))
            .map(|row| row.clone()))
    }

    async fn add_cart_quantity(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<CartRow, RepositoryError> {
        self.check_online()?;
        let quantity = db_quantity(quantity)?;
        Ok(self.add_committed(user_id, variant_id, quantity))
    }

    async fn set_cart_quantity(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Option<CartRow>, RepositoryError> {
        self.check_online()?;
        let quantity = db_quantity(quantity)?;
        Ok(self
            .tables
            .cart
            .get_mut(&(user_id.clone(), variant_id.clone()))
            .map(|mut row| {
                row.quantity = quantity;
                row.updated_at = Utc::now();
                row.clone()
            }))
    }

    async fn remove_cart_item(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
    ) -> Result<bool, RepositoryError> {
        self.check_online()?;
        Ok(self
            .tables
            .cart
            .remove(&(user_id.clone(), variant_id.clone()))
            .is_some())
    }

    async fn clear_cart(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        self.check_online()?;
        let before = self.tables.cart.len();
        self.tables.cart.retain(|(user, _), _| user != user_id);
        Ok(before.saturating_sub(self.tables.cart.len()) as u64)
    }

    async fn cart_count(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        self.check_online()?;
        Ok(self
            .tables
            .cart
            .iter()
            .filter(|e| &e.key().0 == user_id)
            .map(|e| u64::try_from(e.value().quantity).unwrap_or(0))
            .sum())
    }

    async fn favorites(&self, user_id: &UserId) -> Result<Vec<FavoriteRow>, RepositoryError> {
        self.check_online()?;
        let mut rows: Vec<FavoriteRow> = self
            .tables
            .favorites
            .iter()
            .filter(|e| &e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        Ok(rows)
    }

    async fn add_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        self.check_online()?;
        Ok(self.insert_favorite_committed(user_id, product_id))
    }

    async fn remove_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        self.check_online()?;
        Ok(self
            .tables
            .favorites
            .remove(&(user_id.clone(), product_id.clone()))
            .is_some())
    }

    async fn is_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        self.check_online()?;
        Ok(self
            .tables
            .favorites
            .contains_key(&(user_id.clone(), product_id.clone())))
    }

    async fn favorite_count(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        self.check_online()?;
        Ok(self
            .tables
            .favorites
            .iter()
            .filter(|e| &e.key().0 == user_id)
            .count() as u64)
    }
}

#[derive(Debug)]
enum StagedWrite {
    Cart {
        user_id: UserId,
        variant_id: VariantId,
        quantity: i32,
    },
    Favorite {
        user_id: UserId,
        product_id: ProductId,
    },
}

/// A staged set of writes against a [`MemoryCartStore`].
#[derive(Debug)]
pub struct MemoryCartTransaction {
    store: MemoryCartStore,
    staged: Vec<StagedWrite>,
}

impl MemoryCartTransaction {
    /// Count the merge and fail it if it is the injected one.
    fn next_merge(&self) -> Result<(), RepositoryError> {
        self.store.check_online()?;
        let tables = &self.store.tables;
        let n = tables.merges.fetch_add(1, Ordering::SeqCst) + 1;
        if tables.fail_merge_on.load(Ordering::SeqCst) == n {
            return Err(injected_failure());
        }
        Ok(())
    }
}

impl CartTransaction for MemoryCartTransaction {
    async fn merge_cart_item(
        &mut self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<MergeOutcome, RepositoryError> {
        self.next_merge()?;
        let quantity = db_quantity(quantity)?;

        let committed = self
            .store
            .tables
            .cart
            .contains_key(&(user_id.clone(), variant_id.clone()));
        let staged = self.staged.iter().any(|w| {
            matches!(w, StagedWrite::Cart { user_id: u, variant_id: v, .. }
                if u == user_id && v == variant_id)
        });

        self.staged.push(StagedWrite::Cart {
            user_id: user_id.clone(),
            variant_id: variant_id.clone(),
            quantity,
        });
        Ok(if committed || staged {
            MergeOutcome::Existing
        } else {
            MergeOutcome::Inserted
        })
    }

    async fn insert_favorite_if_absent(
        &mut self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<MergeOutcome, RepositoryError> {
        self.next_merge()?;

        let committed = self
            .store
            .tables
            .favorites
            .contains_key(&(user_id.clone(), product_id.clone()));
        let staged = self.staged.iter().any(|w| {
            matches!(w, StagedWrite::Favorite { user_id: u, product_id: p }
                if u == user_id && p == product_id)
        });
        if committed || staged {
            return Ok(MergeOutcome::Existing);
        }

        self.staged.push(StagedWrite::Favorite {
            user_id: user_id.clone(),
            product_id: product_id.clone(),
        });
        Ok(MergeOutcome::Inserted)
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.store.check_online()?;
        for write in &self.staged {
            match write {
                StagedWrite::Cart {
                    user_id,
                    variant_id,
                    quantity,
                } => {
                    self.store.add_committed(user_id, variant_id, *quantity);
                }
                StagedWrite::Favorite {
                    user_id,
                    product_id,
                } => {
                    self.store.insert_favorite_committed(user_id, product_id);
                }
            }
        }
        self.store.tables.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.store.tables.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Process-local catalog.
///
/// Cloning shares the underlying variants.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    variants: Arc<DashMap<VariantId, VariantDetails>>,
    offline: Arc<AtomicBool>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variant.
    pub fn insert(&self, details: VariantDetails) {
        self.variants.insert(details.variant_id.clone(), details);
    }

    /// Remove a variant entirely.
    pub fn remove(&self, variant_id: &VariantId) {
        self.variants.remove(variant_id);
    }

    /// Change a variant's stock level.
    pub fn set_stock(&self, variant_id: &VariantId, stock_quantity: i32) {
        if let Some(mut v) = self.variants.get_mut(variant_id) {
            v.stock_quantity = stock_quantity;
        }
    }

    /// Activate or deactivate a single variant.
    pub fn set_variant_active(&self, variant_id: &VariantId, active: bool) {
        if let Some(mut v) = self.variants.get_mut(variant_id) {
            v.variant_active = active;
        }
    }

    /// Activate or deactivate a product and so every variant under it.
    pub fn set_product_active(&self, product_id: &ProductId, active: bool) {
        for mut v in self.variants.iter_mut() {
            if &v.product_id == product_id {
                v.product_active = active;
            }
        }
    }

    /// Make every subsequent lookup fail (or succeed again when `false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }
}

impl Catalog for MemoryCatalog {
    async fn check_availability(
        &self,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        self.check_online()?;
        Ok(self
            .variants
            .get(variant_id)
            .is_some_and(|v| v.availability(quantity).is_available()))
    }

    async fn variant_details(
        &self,
        variant_ids: &[VariantId],
    ) -> Result<Vec<VariantDetails>, RepositoryError> {
        self.check_online()?;
        Ok(variant_ids
            .iter()
            .filter_map(|id| self.variants.get(id).map(|v| v.clone()))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::parse("user-42").unwrap()
    }

    fn variant(id: &str) -> VariantId {
        VariantId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_dropped_transaction_writes_nothing() {
        let store = MemoryCartStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.merge_cart_item(&user(), &variant("v1"), 2).await.unwrap();
        }
        assert_eq!(store.quantity(&user(), &variant("v1")), None);
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn test_commit_applies_staged_merges() {
        let store = MemoryCartStore::new();
        store.add_cart_quantity(&user(), &variant("v1"), 1).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let existing = tx.merge_cart_item(&user(), &variant("v1"), 2).await.unwrap();
        let inserted = tx.merge_cart_item(&user(), &variant("v2"), 3).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(existing, MergeOutcome::Existing);
        assert_eq!(inserted, MergeOutcome::Inserted);
        assert_eq!(store.quantity(&user(), &variant("v1")), Some(3));
        assert_eq!(store.quantity(&user(), &variant("v2")), Some(3));
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn test_fail_merge_on() {
        let store = MemoryCartStore::new();
        store.fail_merge_on(2);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.merge_cart_item(&user(), &variant("v1"), 1).await.is_ok());
        assert!(tx.merge_cart_item(&user(), &variant("v2"), 1).await.is_err());
        assert!(tx.merge_cart_item(&user(), &variant("v3"), 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_favorite_insert_is_deduplicated() {
        let store = MemoryCartStore::new();
        let product = ProductId::parse("p1").unwrap();

        assert!(store.add_favorite(&user(), &product).await.unwrap());
        assert!(!store.add_favorite(&user(), &product).await.unwrap());
        assert_eq!(store.favorite_rows(&user(), &product), 1);
        assert_eq!(store.favorite_count(&user()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_quantity_requires_row() {
        let store = MemoryCartStore::new();
        assert!(
            store
                .set_cart_quantity(&user(), &variant("v1"), 4)
                .await
                .unwrap()
                .is_none()
        );
        store.add_cart_quantity(&user(), &variant("v1"), 1).await.unwrap();
        let row = store
            .set_cart_quantity(&user(), &variant("v1"), 4)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.quantity, 4);
        assert_eq!(store.cart_count(&user()).await.unwrap(), 4);
    }
}
