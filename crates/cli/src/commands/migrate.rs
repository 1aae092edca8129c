//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! basket-cli migrate
//! ```
//!
//! Migrations are embedded from `crates/storefront/migrations/`:
//! ```text
//! migrations/
//! ├── 20260301000001_create_catalog.sql
//! └── 20260301000002_create_cart.sql
//! ```

use basket_storefront::db::MIGRATOR;

use super::{CommandError, connect_database};

/// Run storefront database migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect_database().await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
