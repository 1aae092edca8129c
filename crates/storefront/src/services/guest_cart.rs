//! Guest cart service.
//!
//! A guest cart is two hashes keyed by variant id: `cart:<session>` holds
//! quantities and `cart-added:<session>` holds the time each variant first
//! entered the cart. Both expire five days after the last write.

use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use tracing::instrument;

use basket_core::{MAX_LINE_QUANTITY, SessionId, VariantId};

use super::{ServiceError, keys};
use crate::kv::KvStore;
use crate::models::GuestCartItem;

/// Guest cart operations over the key-value store.
pub struct GuestCartService<'a, K> {
    kv: &'a K,
}

impl<'a, K: KvStore> GuestCartService<'a, K> {
    /// Create a new guest cart service.
    #[must_use]
    pub const fn new(kv: &'a K) -> Self {
        Self { kv }
    }

    /// Add `quantity` units of a variant, on top of any already in the cart.
    ///
    /// The increment is atomic in the store, so concurrent adds are never lost.
    /// An add that would push the line past [`MAX_LINE_QUANTITY`] is undone.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidQuantity` for a quantity of zero or a
    /// line total above [`MAX_LINE_QUANTITY`], or `ServiceError::Store` if the
    /// store fails.
    #[instrument(skip_all, fields(session_id = %session_id, variant_id = %variant_id, quantity = quantity))]
    pub async fn add_item(
        &self,
        session_id: &SessionId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<GuestCartItem, ServiceError> {
        if quantity == 0 || quantity > MAX_LINE_QUANTITY {
            return Err(ServiceError::InvalidQuantity(i64::from(quantity)));
        }

        let key = keys::cart(session_id);
        let total = self
            .kv
            .hincrby(&key, variant_id.as_str(), i64::from(quantity))
            .await?;
        let Some(line_total) = line_quantity(total) else {
            self.undo_add(session_id, variant_id, quantity).await?;
            tracing::debug!(total, "Guest cart line over the limit");
            return Err(ServiceError::InvalidQuantity(total));
        };
        let added_at = self.record_added(session_id, variant_id).await?;
        self.refresh(session_id).await?;

        tracing::debug!(total, "Added to guest cart");
        Ok(GuestCartItem {
            variant_id: variant_id.clone(),
            quantity: line_total,
            added_at,
        })
    }

    /// All entries in the cart, oldest first.
    ///
    /// Entries with an unparseable variant id or quantity are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn get_cart(&self, session_id: &SessionId) -> Result<Vec<GuestCartItem>, ServiceError> {
        let quantities = self.kv.hgetall(&keys::cart(session_id)).await?;
        if quantities.is_empty() {
            return Ok(Vec::new());
        }
        let added = self.kv.hgetall(&keys::cart_added(session_id)).await?;
        let now = Utc::now();

        let mut items: Vec<GuestCartItem> = quantities
            .into_iter()
            .filter_map(|(field, raw)| parse_entry(&field, &raw, &added, now))
            .collect();
        items.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.variant_id.cmp(&b.variant_id))
        });
        Ok(items)
    }

    /// Set the quantity of a variant outright.
    ///
    /// A quantity of zero or less removes the entry and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidQuantity` for quantities above
    /// [`MAX_LINE_QUANTITY`], or `ServiceError::Store` if the store fails.
    #[instrument(skip_all, fields(session_id = %session_id, variant_id = %variant_id, quantity = quantity))]
    pub async fn update_quantity(
        &self,
        session_id: &SessionId,
        variant_id: &VariantId,
        quantity: i64,
    ) -> Result<Option<GuestCartItem>, ServiceError> {
        if quantity <= 0 {
            self.remove_item(session_id, variant_id).await?;
            return Ok(None);
        }
        let quantity = line_quantity(quantity).ok_or(ServiceError::InvalidQuantity(quantity))?;

        self.kv
            .hset(
                &keys::cart(session_id),
                variant_id.as_str(),
                &quantity.to_string(),
            )
            .await?;
        let added_at = self.record_added(session_id, variant_id).await?;
        self.refresh(session_id).await?;

        Ok(Some(GuestCartItem {
            variant_id: variant_id.clone(),
            quantity,
            added_at,
        }))
    }

    /// Remove a variant. Returns whether it was in the cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    #[instrument(skip_all, fields(session_id = %session_id, variant_id = %variant_id))]
    pub async fn remove_item(
        &self,
        session_id: &SessionId,
        variant_id: &VariantId,
    ) -> Result<bool, ServiceError> {
        let removed = self
            .kv
            .hdel(&keys::cart(session_id), variant_id.as_str())
            .await?;
        self.kv
            .hdel(&keys::cart_added(session_id), variant_id.as_str())
            .await?;
        self.refresh(session_id).await?;
        Ok(removed)
    }

    /// Remove the whole cart. Clearing an empty cart is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn clear_cart(&self, session_id: &SessionId) -> Result<(), ServiceError> {
        self.kv
            .del(&[&keys::cart(session_id), &keys::cart_added(session_id)])
            .await?;
        Ok(())
    }

    /// Total units across all entries; 0 for an empty or missing cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn get_cart_count(&self, session_id: &SessionId) -> Result<u64, ServiceError> {
        let quantities = self.kv.hgetall(&keys::cart(session_id)).await?;
        Ok(quantities
            .values()
            .filter_map(|raw| stored_quantity(raw))
            .map(u64::from)
            .sum())
    }

    /// Record the first-added time for a variant unless one exists, and return it.
    async fn record_added(
        &self,
        session_id: &SessionId,
        variant_id: &VariantId,
    ) -> Result<DateTime<Utc>, ServiceError> {
        let key = keys::cart_added(session_id);
        // stored as epoch millis
        let now = Utc::now().trunc_subsecs(3);
        if self
            .kv
            .hsetnx(&key, variant_id.as_str(), &now.timestamp_millis().to_string())
            .await?
        {
            return Ok(now);
        }
        let stored = self.kv.hget(&key, variant_id.as_str()).await?;
        Ok(stored.as_deref().and_then(parse_millis).unwrap_or(now))
    }

    /// Take back an increment that overshot the line limit.
    async fn undo_add(
        &self,
        session_id: &SessionId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<(), ServiceError> {
        let key = keys::cart(session_id);
        let restored = self
            .kv
            .hincrby(&key, variant_id.as_str(), -i64::from(quantity))
            .await?;
        if restored <= 0 {
            self.kv.hdel(&key, variant_id.as_str()).await?;
            self.kv
                .hdel(&keys::cart_added(session_id), variant_id.as_str())
                .await?;
        }
        Ok(())
    }

    /// Push both hashes' expiry five days out.
    async fn refresh(&self, session_id: &SessionId) -> Result<(), ServiceError> {
        self.kv
            .expire(&keys::cart(session_id), keys::GUEST_DATA_TTL)
            .await?;
        self.kv
            .expire(&keys::cart_added(session_id), keys::GUEST_DATA_TTL)
            .await?;
        Ok(())
    }
}

/// A line quantity in `1..=MAX_LINE_QUANTITY`.
fn line_quantity(quantity: i64) -> Option<u32> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q))
}

/// Quantity as stored in the cart hash. Values above the line limit read as
/// the limit.
fn stored_quantity(raw: &str) -> Option<u32> {
    let value = raw.parse::<u64>().ok().filter(|q| *q > 0)?;
    Some(u32::try_from(value).map_or(MAX_LINE_QUANTITY, |q| q.min(MAX_LINE_QUANTITY)))
}

fn parse_millis(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

fn parse_entry(
    field: &str,
    raw: &str,
    added: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> Option<GuestCartItem> {
    let Ok(variant_id) = VariantId::parse(field) else {
        tracing::warn!(field, "Skipping guest cart entry with invalid variant id");
        return None;
    };
    let Some(quantity) = stored_quantity(raw) else {
        tracing::warn!(variant_id = %variant_id, raw, "Skipping malformed guest cart quantity");
        return None;
    };
    if raw != quantity.to_string() {
        tracing::warn!(variant_id = %variant_id, raw, quantity, "Clamping oversized guest cart quantity");
    }
    let added_at = added
        .get(field)
        .and_then(|raw| parse_millis(raw))
        .unwrap_or(now);
    Some(GuestCartItem {
        variant_id,
        quantity,
        added_at,
    })
}
