//! Catalog lookups over `PostgreSQL`.

use sqlx::PgPool;

use basket_core::VariantId;

use super::{Catalog, RepositoryError};
use crate::models::VariantDetails;

/// Read-only access to products and variants.
pub struct PgCatalog<'a> {
    pool: &'a PgPool,
}

impl<'a> PgCatalog<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl Catalog for PgCatalog<'_> {
    async fn check_availability(
        &self,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let available: Option<bool> = sqlx::query_scalar(
            r"
            SELECT p.is_active AND v.is_active AND v.stock_quantity >= $2
            FROM catalog.product_variant v
            JOIN catalog.product p ON p.id = v.product_id
            WHERE v.id = $1
            ",
        )
        .bind(variant_id)
        .bind(i64::from(quantity))
        .fetch_optional(self.pool)
        .await?;
        Ok(available.unwrap_or(false))
    }

    async fn variant_details(
        &self,
        variant_ids: &[VariantId],
    ) -> Result<Vec<VariantDetails>, RepositoryError> {
        if variant_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<&str> = variant_ids.iter().map(VariantId::as_str).collect();

        let rows = sqlx::query_as::<_, VariantDetails>(
            r"
            SELECT v.id AS variant_id,
                   p.id AS product_id,
                   p.name AS product_name,
                   p.is_active AS product_active,
                   v.title AS variant_title,
                   v.sku,
                   v.price,
                   v.compare_at_price,
                   v.stock_quantity,
                   v.is_active AS variant_active,
                   (SELECT m.url FROM catalog.product_media m
                     WHERE m.product_id = p.id
                     ORDER BY m.position, m.id
                     LIMIT 1) AS image_url
            FROM catalog.product_variant v
            JOIN catalog.product p ON p.id = v.product_id
            WHERE v.id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
