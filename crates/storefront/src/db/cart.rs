//! Cart and favorite repository over `PostgreSQL`.

use sqlx::{PgPool, Postgres, Transaction};

use basket_core::{ProductId, UserId, VariantId};

use super::{CartStore, CartTransaction, RepositoryError};
use crate::models::{CartRow, FavoriteRow, MergeOutcome};

const CART_COLUMNS: &str = "user_id, variant_id, quantity, added_at, updated_at";

/// Convert a quantity for an `INTEGER` column.
fn db_quantity(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity).map_err(|_| RepositoryError::QuantityOutOfRange(quantity))
}

/// Repository for user cart and favorite rows.
pub struct PgCartStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgCartStore<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl CartStore for PgCartStore<'_> {
    type Transaction = PgCartTransaction;

    async fn begin(&self) -> Result<PgCartTransaction, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(PgCartTransaction { tx })
    }

    async fn cart_items(&self, user_id: &UserId) -> Result<Vec<CartRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart_item \
             WHERE user_id = $1 ORDER BY added_at, variant_id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn cart_item(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
    ) -> Result<Option<CartRow>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart_item \
             WHERE user_id = $1 AND variant_id = $2"
        ))
        .bind(user_id)
        .bind(variant_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    async fn add_cart_quantity(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<CartRow, RepositoryError> {
        sqlx::query_as::<_, CartRow>(&format!(
            r"
            INSERT INTO storefront.cart_item (user_id, variant_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, variant_id) DO UPDATE
               SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity,
                   updated_at = now()
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(variant_id)
        .bind(db_quantity(quantity)?)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, &format!("variant {variant_id}")))
    }

    async fn set_cart_quantity(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Option<CartRow>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            r"
            UPDATE storefront.cart_item
               SET quantity = $3, updated_at = now()
             WHERE user_id = $1 AND variant_id = $2
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(variant_id)
        .bind(db_quantity(quantity)?)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    async fn remove_cart_item(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.cart_item WHERE user_id = $1 AND variant_id = $2",
        )
        .bind(user_id)
        .bind(variant_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn cart_count(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM storefront.cart_item WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        u64::try_from(total)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative cart total {total}")))
    }

    async fn favorites(&self, user_id: &UserId) -> Result<Vec<FavoriteRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            r"
            SELECT user_id, product_id, created_at
            FROM storefront.favorite
            WHERE user_id = $1
            ORDER BY created_at, product_id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn add_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.favorite (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, &format!("product {product_id}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.favorite WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM storefront.favorite WHERE user_id = $1 AND product_id = $2
            )
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    async fn favorite_count(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storefront.favorite WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;
        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative favorite count {count}")))
    }
}

/// An open `PostgreSQL` transaction holding one pooled connection.
///
/// The connection returns to the pool on commit, rollback or drop.
pub struct PgCartTransaction {
    tx: Transaction<'static, Postgres>,
}

impl CartTransaction for PgCartTransaction {
    async fn merge_cart_item(
        &mut self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<MergeOutcome, RepositoryError> {
        // xmax is zero only for a freshly inserted tuple
        let inserted: bool = sqlx::query_scalar(
            r"
            INSERT INTO storefront.cart_item (user_id, variant_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, variant_id) DO UPDATE
               SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity,
                   updated_at = now()
            RETURNING (xmax = 0) AS inserted
            ",
        )
        .bind(user_id)
        .bind(variant_id)
        .bind(db_quantity(quantity)?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, &format!("variant {variant_id}")))?;

        Ok(if inserted {
            MergeOutcome::Inserted
        } else {
            MergeOutcome::Existing
        })
    }

    async fn insert_favorite_if_absent(
        &mut self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<MergeOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.favorite (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, &format!("product {product_id}")))?;

        Ok(if result.rows_affected() > 0 {
            MergeOutcome::Inserted
        } else {
            MergeOutcome::Existing
        })
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_quantity_range() {
        assert_eq!(db_quantity(3).ok(), Some(3));
        assert!(matches!(
            db_quantity(u32::MAX),
            Err(RepositoryError::QuantityOutOfRange(u32::MAX))
        ));
    }
}
