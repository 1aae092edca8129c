//! Status enums for cart lines.

use serde::{Deserialize, Serialize};

/// Largest quantity a single cart line may hold, guest or user.
pub const MAX_LINE_QUANTITY: u32 = 9_999;

/// Whether a variant can currently be bought in a given quantity.
///
/// Evaluated against the catalog when a user cart is summarised or validated
/// before checkout. Checks run in declaration order: a missing variant is
/// reported before an inactive product, which is reported before stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    #[default]
    Available,
    /// The variant no longer exists in the catalog.
    Missing,
    /// The parent product has been deactivated.
    ProductInactive,
    /// The variant itself has been deactivated.
    VariantInactive,
    /// Active, but stock is below the requested quantity.
    InsufficientStock,
}

impl AvailabilityStatus {
    /// Evaluate availability from catalog flags and stock.
    #[must_use]
    pub fn evaluate(
        product_active: bool,
        variant_active: bool,
        stock: i32,
        requested: u32,
    ) -> Self {
        if !product_active {
            Self::ProductInactive
        } else if !variant_active {
            Self::VariantInactive
        } else if i64::from(stock) < i64::from(requested) {
            Self::InsufficientStock
        } else {
            Self::Available
        }
    }

    /// Whether the line can be bought as-is.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }

    /// Whether the line should still be shown in a cart summary.
    ///
    /// Lines for removed or deactivated merchandise are hidden; lines that are
    /// merely short on stock stay visible so the shopper can adjust them.
    #[must_use]
    pub const fn is_displayable(self) -> bool {
        matches!(self, Self::Available | Self::InsufficientStock)
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Missing => write!(f, "missing"),
            Self::ProductInactive => write!(f, "product_inactive"),
            Self::VariantInactive => write!(f, "variant_inactive"),
            Self::InsufficientStock => write!(f, "insufficient_stock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_order() {
        assert_eq!(
            AvailabilityStatus::evaluate(false, false, 0, 1),
            AvailabilityStatus::ProductInactive
        );
        assert_eq!(
            AvailabilityStatus::evaluate(true, false, 10, 1),
            AvailabilityStatus::VariantInactive
        );
        assert_eq!(
            AvailabilityStatus::evaluate(true, true, 2, 3),
            AvailabilityStatus::InsufficientStock
        );
        assert_eq!(
            AvailabilityStatus::evaluate(true, true, 3, 3),
            AvailabilityStatus::Available
        );
    }

    #[test]
    fn test_extreme_quantities() {
        assert_eq!(
            AvailabilityStatus::evaluate(true, true, i32::MAX, u32::MAX),
            AvailabilityStatus::InsufficientStock
        );
        assert_eq!(
            AvailabilityStatus::evaluate(true, true, i32::MAX, MAX_LINE_QUANTITY),
            AvailabilityStatus::Available
        );
    }

    #[test]
    fn test_negative_stock_is_insufficient() {
        assert_eq!(
            AvailabilityStatus::evaluate(true, true, -1, 0),
            AvailabilityStatus::InsufficientStock
        );
    }

    #[test]
    fn test_displayable() {
        assert!(AvailabilityStatus::InsufficientStock.is_displayable());
        assert!(!AvailabilityStatus::ProductInactive.is_displayable());
        assert!(!AvailabilityStatus::Missing.is_displayable());
    }
}
