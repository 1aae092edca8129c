//! Key-value store keys and lifetimes for guest state.

use std::time::Duration;

use basket_core::SessionId;

use crate::models::TransferEntity;

/// Lifetime of a session record, refreshed on activity.
pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Lifetime of a guest cart or favorites set, refreshed on every write.
pub const GUEST_DATA_TTL: Duration = Duration::from_secs(5 * 24 * 60 * 60);

/// Lifetime of a transfer lock; bounds how long a crashed transfer blocks retries.
pub const TRANSFER_LOCK_TTL: Duration = Duration::from_secs(30);

/// `session:<session>`
#[must_use]
pub fn session(session_id: &SessionId) -> String {
    format!("session:{session_id}")
}

/// `cart:<session>`: variant id -> quantity.
#[must_use]
pub fn cart(session_id: &SessionId) -> String {
    format!("cart:{session_id}")
}

/// `cart-added:<session>`: variant id -> first-added time in epoch millis.
#[must_use]
pub fn cart_added(session_id: &SessionId) -> String {
    format!("cart-added:{session_id}")
}

/// `favorites:<session>`
#[must_use]
pub fn favorites(session_id: &SessionId) -> String {
    format!("favorites:{session_id}")
}

/// `transfer-lock:<entity>:<session>`
#[must_use]
pub fn transfer_lock(entity: TransferEntity, session_id: &SessionId) -> String {
    format!("transfer-lock:{entity}:{session_id}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let sid = SessionId::parse("guest_abc_1").unwrap();
        assert_eq!(session(&sid), "session:guest_abc_1");
        assert_eq!(cart(&sid), "cart:guest_abc_1");
        assert_eq!(cart_added(&sid), "cart-added:guest_abc_1");
        assert_eq!(favorites(&sid), "favorites:guest_abc_1");
        assert_eq!(
            transfer_lock(TransferEntity::Cart, &sid),
            "transfer-lock:cart:guest_abc_1"
        );
    }

    #[test]
    fn test_keys_of_different_sessions_are_disjoint() {
        let ids = ["abc", "abc-added", "abc.added", "added", "cart", "cart-added"];
        let mut seen = std::collections::HashSet::new();
        for id in ids {
            let sid = SessionId::parse(id).unwrap();
            for key in [
                session(&sid),
                cart(&sid),
                cart_added(&sid),
                favorites(&sid),
                transfer_lock(TransferEntity::Cart, &sid),
                transfer_lock(TransferEntity::Favorites, &sid),
            ] {
                assert!(seen.insert(key.clone()), "duplicate key {key}");
            }
        }
    }

    #[test]
    fn test_ttls() {
        assert_eq!(SESSION_TTL.as_secs(), 604_800);
        assert_eq!(GUEST_DATA_TTL.as_secs(), 432_000);
    }
}
