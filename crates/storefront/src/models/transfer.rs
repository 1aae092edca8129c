//! Guest-to-user transfer results.

use std::fmt;

use serde::Serialize;

use crate::services::ServiceError;

/// Effect of merging one guest entry into the user's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No row existed; one was inserted.
    Inserted,
    /// A row already existed; cart quantities were added, favorites left as is.
    Existing,
}

/// Which half of the guest state is being transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferEntity {
    Cart,
    Favorites,
}

impl TransferEntity {
    /// Key segment used for the transfer lock.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Favorites => "favorites",
        }
    }

    const fn noun(self) -> &'static str {
        match self {
            Self::Cart => "cart items",
            Self::Favorites => "favorites",
        }
    }
}

impl fmt::Display for TransferEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one successful entity transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub entity: TransferEntity,
    /// Guest entries found.
    pub total: usize,
    /// Entries that created a new row.
    pub inserted: usize,
    /// Entries that met an existing row.
    pub existing: usize,
    /// Whether the guest source was removed after commit.
    pub source_cleared: bool,
}

impl TransferSummary {
    /// Summary for a guest source with nothing in it.
    #[must_use]
    pub const fn nothing(entity: TransferEntity) -> Self {
        Self {
            entity,
            total: 0,
            inserted: 0,
            existing: 0,
            source_cleared: false,
        }
    }

    /// Tally merge outcomes.
    #[must_use]
    pub fn from_outcomes(entity: TransferEntity, outcomes: &[MergeOutcome]) -> Self {
        let inserted = outcomes
            .iter()
            .filter(|o| **o == MergeOutcome::Inserted)
            .count();
        Self {
            entity,
            total: outcomes.len(),
            inserted,
            existing: outcomes.len() - inserted,
            source_cleared: false,
        }
    }

    /// Shopper-facing description.
    #[must_use]
    pub fn message(&self) -> String {
        if self.total == 0 {
            return format!("No {} to transfer", self.entity.noun());
        }
        let merged = match self.entity {
            TransferEntity::Cart => "merged",
            TransferEntity::Favorites => "already saved",
        };
        format!(
            "Transferred {} {} ({} new, {} {merged})",
            self.total,
            self.entity.noun(),
            self.inserted,
            self.existing
        )
    }
}

/// Combined result of transferring cart and favorites.
///
/// The halves run independently; either may fail without affecting the other.
#[derive(Debug)]
pub struct TransferReport {
    pub cart: Result<TransferSummary, ServiceError>,
    pub favorites: Result<TransferSummary, ServiceError>,
}

impl TransferReport {
    /// `true` only when both halves succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.cart.is_ok() && self.favorites.is_ok()
    }

    /// Shopper-facing description of the whole transfer.
    #[must_use]
    pub fn message(&self) -> String {
        match (&self.cart, &self.favorites) {
            (Ok(_), Ok(_)) => "Your saved items have been restored".to_owned(),
            (Err(_), Ok(_)) => "Could not restore your saved cart".to_owned(),
            (Ok(_), Err(_)) => "Could not restore your saved favorites".to_owned(),
            (Err(_), Err(_)) => "Could not restore your saved items".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_outcomes() {
        let summary = TransferSummary::from_outcomes(
            TransferEntity::Cart,
            &[
                MergeOutcome::Inserted,
                MergeOutcome::Existing,
                MergeOutcome::Inserted,
            ],
        );
        assert_eq!(summary.total, 3);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.existing, 1);
        assert_eq!(
            summary.message(),
            "Transferred 3 cart items (2 new, 1 merged)"
        );
    }

    #[test]
    fn test_nothing_message() {
        assert_eq!(
            TransferSummary::nothing(TransferEntity::Favorites).message(),
            "No favorites to transfer"
        );
    }

    #[test]
    fn test_report_success_is_conjunction() {
        let ok = || Ok(TransferSummary::nothing(TransferEntity::Cart));
        let report = TransferReport {
            cart: ok(),
            favorites: ok(),
        };
        assert!(report.success());

        let report = TransferReport {
            cart: Err(ServiceError::TransferInProgress),
            favorites: ok(),
        };
        assert!(!report.success());
        assert_eq!(report.message(), "Could not restore your saved cart");
    }
}
