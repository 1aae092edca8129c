//! Guest state inspection.

use basket_core::SessionId;
use basket_storefront::services::{GuestCartService, GuestFavoritesService, SessionService};
use serde_json::json;

use super::{CommandError, connect_store, print_json};

/// Print the session record, cart and favorites of a guest session.
pub async fn show(session: &SessionId) -> Result<(), CommandError> {
    let kv = connect_store().await?;

    let record = SessionService::new(&kv).get_session(session).await?;
    let cart = GuestCartService::new(&kv).get_cart(session).await?;
    let favorites = GuestFavoritesService::new(&kv).get_favorites(session).await?;

    if record.is_none() && cart.is_empty() && favorites.is_empty() {
        tracing::warn!(session_id = %session, "No guest state found");
    }

    print_json(&json!({
        "session_id": session,
        "session": record,
        "cart": cart,
        "favorites": favorites,
    }))
}
