//! Cart and favorites domain types.

use std::collections::HashMap;

use basket_core::{
    AvailabilityStatus, CurrencyCode, Price, ProductId, UserId, VariantId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::VariantDetails;

/// One entry of a guest (key-value backed) cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestCartItem {
    pub variant_id: VariantId,
    /// Always at least 1.
    pub quantity: u32,
    /// When the variant first entered this guest cart.
    pub added_at: DateTime<Utc>,
}

/// A persistent cart row in `storefront.cart_item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CartRow {
    pub user_id: UserId,
    pub variant_id: VariantId,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartRow {
    /// Quantity as an unsigned count (rows are constrained to `quantity > 0`).
    #[must_use]
    pub fn quantity(&self) -> u32 {
        u32::try_from(self.quantity).unwrap_or(0)
    }
}

/// A persistent favorite row in `storefront.favorite`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FavoriteRow {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

/// A priced, displayable line of a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
    pub compare_at_price: Option<Price>,
    pub availability: AvailabilityStatus,
    pub added_at: DateTime<Utc>,
}

/// A user's cart joined against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    /// Sum of quantities over displayed lines.
    pub item_count: u32,
    pub subtotal: Price,
}

impl CartSummary {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            item_count: 0,
            subtotal: Price::zero(CurrencyCode::INR),
        }
    }

    /// Build a summary from cart rows and the catalog entries for their variants.
    ///
    /// Rows whose variant is gone, or whose product or variant has been
    /// deactivated, are left out. Lines keep the rows' order.
    #[must_use]
    pub fn build(rows: &[CartRow], details: &[VariantDetails]) -> Self {
        let by_variant: HashMap<&VariantId, &VariantDetails> =
            details.iter().map(|d| (&d.variant_id, d)).collect();

        let mut summary = Self::empty();
        for row in rows {
            let Some(detail) = by_variant.get(&row.variant_id) else {
                continue;
            };
            let quantity = row.quantity();
            let availability = detail.availability(quantity);
            if !availability.is_displayable() {
                continue;
            }

            let unit_price = detail.unit_price();
            let line_total = unit_price.times(quantity);
            summary.subtotal = summary
                .subtotal
                .checked_add(line_total)
                .unwrap_or(summary.subtotal);
            summary.item_count = summary.item_count.saturating_add(quantity);
            summary.items.push(CartLine {
                variant_id: row.variant_id.clone(),
                product_id: detail.product_id.clone(),
                name: detail.display_name(),
                sku: detail.sku.clone(),
                image_url: detail.image_url.clone(),
                quantity,
                unit_price,
                line_total,
                compare_at_price: detail
                    .compare_at_price
                    .map(|amount| Price::new(amount, unit_price.currency_code)),
                availability,
                added_at: row.added_at,
            });
        }
        summary
    }
}

/// A problem that blocks checkout for one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartIssue {
    pub variant_id: VariantId,
    pub status: AvailabilityStatus,
    /// Human-readable description for the shopper.
    pub message: String,
}

/// Result of checking a cart immediately before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartValidation {
    pub valid: bool,
    pub issues: Vec<CartIssue>,
}

impl CartValidation {
    /// Check every row against the catalog.
    ///
    /// An empty cart is never valid for checkout.
    #[must_use]
    pub fn evaluate(rows: &[CartRow], details: &[VariantDetails]) -> Self {
        let by_variant: HashMap<&VariantId, &VariantDetails> =
            details.iter().map(|d| (&d.variant_id, d)).collect();

        let issues: Vec<CartIssue> = rows
            .iter()
            .filter_map(|row| {
                let quantity = row.quantity();
                let (status, message) = match by_variant.get(&row.variant_id) {
                    None => (
                        AvailabilityStatus::Missing,
                        format!("Item {} no longer exists", row.variant_id),
                    ),
                    Some(detail) => {
                        let status = detail.availability(quantity);
                        let name = detail.display_name();
                        let message = match status {
                            AvailabilityStatus::Available => return None,
                            AvailabilityStatus::Missing => {
                                format!("{name} no longer exists")
                            }
                            AvailabilityStatus::ProductInactive => {
                                format!("{} is no longer available", detail.product_name)
                            }
                            AvailabilityStatus::VariantInactive => {
                                format!("{name} is no longer available")
                            }
                            AvailabilityStatus::InsufficientStock => format!(
                                "Only {} left in stock for {name} (requested {quantity})",
                                detail.stock_quantity.max(0)
                            ),
                        };
                        (status, message)
                    }
                };
                Some(CartIssue {
                    variant_id: row.variant_id.clone(),
                    status,
                    message,
                })
            })
            .collect();

        Self {
            valid: !rows.is_empty() && issues.is_empty(),
            issues,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn variant(id: &str, product: &str, price: i64, stock: i32) -> VariantDetails {
        VariantDetails {
            variant_id: VariantId::parse(id).unwrap(),
            product_id: ProductId::parse(product).unwrap(),
            product_name: format!("Product {product}"),
            product_active: true,
            variant_title: Some("M".to_owned()),
            sku: format!("SKU-{id}"),
            price: Decimal::new(price, 0),
            compare_at_price: None,
            stock_quantity: stock,
            variant_active: true,
            image_url: None,
        }
    }

    fn row(variant: &str, quantity: i32) -> CartRow {
        let now = Utc::now();
        CartRow {
            user_id: UserId::parse("user-42").unwrap(),
            variant_id: VariantId::parse(variant).unwrap(),
            quantity,
            added_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_summary_prices_lines() {
        let details = vec![variant("v1", "p1", 500, 10), variant("v2", "p2", 250, 10)];
        let rows = vec![row("v1", 2), row("v2", 1)];

        let summary = CartSummary::build(&rows, &details);

        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal.amount, Decimal::new(1250, 0));
        assert_eq!(summary.items[0].line_total.amount, Decimal::new(1000, 0));
        assert_eq!(summary.items[0].name, "Product p1 (M)");
    }

    #[test]
    fn test_summary_drops_inactive_and_missing() {
        let mut inactive_product = variant("v1", "p1", 500, 10);
        inactive_product.product_active = false;
        let mut inactive_variant = variant("v2", "p2", 500, 10);
        inactive_variant.variant_active = false;
        let details = vec![inactive_product, inactive_variant, variant("v3", "p3", 100, 10)];
        let rows = vec![row("v1", 1), row("v2", 1), row("v3", 1), row("gone", 1)];

        let summary = CartSummary::build(&rows, &details);

        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].variant_id.as_str(), "v3");
        assert_eq!(summary.subtotal.amount, Decimal::new(100, 0));
    }

    #[test]
    fn test_summary_keeps_short_stock_lines() {
        let details = vec![variant("v1", "p1", 100, 1)];
        let summary = CartSummary::build(&[row("v1", 3)], &details);

        assert_eq!(summary.items.len(), 1);
        assert_eq!(
            summary.items[0].availability,
            AvailabilityStatus::InsufficientStock
        );
    }

    #[test]
    fn test_validation_reports_each_problem() {
        let mut inactive = variant("v2", "p2", 100, 5);
        inactive.variant_active = false;
        let details = vec![variant("v1", "p1", 100, 1), inactive, variant("v3", "p3", 100, 5)];
        let rows = vec![row("v1", 2), row("v2", 1), row("v3", 1), row("gone", 1)];

        let validation = CartValidation::evaluate(&rows, &details);

        assert!(!validation.valid);
        let statuses: Vec<_> = validation.issues.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![
                AvailabilityStatus::InsufficientStock,
                AvailabilityStatus::VariantInactive,
                AvailabilityStatus::Missing,
            ]
        );
        assert_eq!(
            validation.issues[0].message,
            "Only 1 left in stock for Product p1 (M) (requested 2)"
        );
    }

    #[test]
    fn test_validation_ok() {
        let details = vec![variant("v1", "p1", 100, 5)];
        let validation = CartValidation::evaluate(&[row("v1", 5)], &details);
        assert!(validation.valid);
        assert!(validation.issues.is_empty());
    }

    #[test]
    fn test_validation_empty_cart_is_invalid() {
        let validation = CartValidation::evaluate(&[], &[]);
        assert!(!validation.valid);
        assert!(validation.issues.is_empty());
    }
}
