//! Catalog types read by the cart services.

use basket_core::{AvailabilityStatus, CurrencyCode, Price, ProductId, VariantId};
use rust_decimal::Decimal;
use serde::Serialize;

/// A purchasable variant joined with its product and primary image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct VariantDetails {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_active: bool,
    /// Variant label such as a size or colour; `None` for single-variant products.
    pub variant_title: Option<String>,
    pub sku: String,
    pub price: Decimal,
    /// Strike-through price (MRP), when the variant is discounted.
    pub compare_at_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub variant_active: bool,
    pub image_url: Option<String>,
}

impl VariantDetails {
    /// Availability of this variant for `requested` units.
    #[must_use]
    pub fn availability(&self, requested: u32) -> AvailabilityStatus {
        AvailabilityStatus::evaluate(
            self.product_active,
            self.variant_active,
            self.stock_quantity,
            requested,
        )
    }

    /// Unit price in the store currency.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::new(self.price, CurrencyCode::INR)
    }

    /// Display name combining product and variant title.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.variant_title {
            Some(title) if !title.is_empty() => format!("{} ({title})", self.product_name),
            _ => self.product_name.clone(),
        }
    }
}
