//! Operator-run guest transfer.
//!
//! Runs the same merge as login does and prints the report. The guest
//! session record is left in place so the shopper's cookie keeps working.

use basket_core::{SessionId, UserId};
use basket_storefront::db::PgCartStore;
use basket_storefront::routes::transfer::TransferPayload;
use basket_storefront::services::TransferService;
use serde_json::json;

use super::{CommandError, connect_database, connect_store, print_json};

/// Transfer `session`'s cart and favorites into `user`.
///
/// Returns whether both halves succeeded.
pub async fn run(session: &SessionId, user: &UserId) -> Result<bool, CommandError> {
    let pool = connect_database().await?;
    let kv = connect_store().await?;
    let store = PgCartStore::new(&pool);

    tracing::info!(session_id = %session, user_id = %user, "Transferring guest data");
    let report = TransferService::new(&kv, &store)
        .transfer_all(session, user)
        .await;

    print_json(&json!({
        "success": report.success(),
        "message": report.message(),
        "report": TransferPayload::from(&report),
    }))?;

    Ok(report.success())
}
