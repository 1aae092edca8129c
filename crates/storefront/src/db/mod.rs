//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `basket_storefront`
//!
//! ## Tables
//!
//! - `catalog.product` - Products (read-only here)
//! - `catalog.product_variant` - Purchasable variants with price and stock
//! - `catalog.product_media` - Product images
//! - `storefront.cart_item` - Signed-in users' carts, unique per `(user_id, variant_id)`
//! - `storefront.favorite` - Signed-in users' favorites, unique per `(user_id, product_id)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p basket-cli -- migrate
//! ```
//!
//! Services are written against the [`CartStore`], [`CartTransaction`] and
//! [`Catalog`] traits; [`memory`] provides in-process fakes for tests.

pub mod cart;
pub mod catalog;
pub mod memory;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use basket_core::{ProductId, UserId, VariantId};

use crate::models::{CartRow, FavoriteRow, MergeOutcome, VariantDetails};

pub use cart::{PgCartStore, PgCartTransaction};
pub use catalog::PgCatalog;

/// Embedded storefront migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Quantity does not fit the quantity column.
    #[error("quantity {0} is out of range")]
    QuantityOutOfRange(u32),

    /// Constraint violation (e.g., unknown variant).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning foreign-key violations into `Conflict`.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_foreign_key_violation()
        {
            return Self::Conflict(format!("{what} does not exist"));
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Persistent cart and favorite rows for signed-in users.
///
/// Every method is a single statement; use [`CartStore::begin`] when several
/// writes must land together.
pub trait CartStore: Send + Sync {
    /// Transaction handle returned by [`CartStore::begin`].
    type Transaction: CartTransaction;

    /// Start a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, RepositoryError>> + Send;

    /// All cart rows for a user, oldest first.
    fn cart_items(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<CartRow>, RepositoryError>> + Send;

    /// One cart row.
    fn cart_item(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
    ) -> impl Future<Output = Result<Option<CartRow>, RepositoryError>> + Send;

    /// Insert a row or atomically add `quantity` to an existing one.
    fn add_cart_quantity(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartRow, RepositoryError>> + Send;

    /// Overwrite the quantity of an existing row. `None` if there is no row.
    fn set_cart_quantity(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> impl Future<Output = Result<Option<CartRow>, RepositoryError>> + Send;

    /// Delete one row. Returns whether it existed.
    fn remove_cart_item(
        &self,
        user_id: &UserId,
        variant_id: &VariantId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete every cart row for a user. Returns the number removed.
    fn clear_cart(&self, user_id: &UserId)
    -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// Sum of quantities in a user's cart.
    fn cart_count(&self, user_id: &UserId)
    -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// All favorites for a user, oldest first.
    fn favorites(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<FavoriteRow>, RepositoryError>> + Send;

    /// Insert a favorite unless present. Returns whether a row was inserted.
    fn add_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete a favorite. Returns whether it existed.
    fn remove_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Whether a user has favorited a product.
    fn is_favorite(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Number of favorites for a user.
    fn favorite_count(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;
}

/// Writes that commit or roll back together.
///
/// Dropping a transaction without committing rolls it back.
pub trait CartTransaction: Send {
    /// Add `quantity` to the user's row for the variant, inserting it if absent.
    fn merge_cart_item(
        &mut self,
        user_id: &UserId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> impl Future<Output = Result<MergeOutcome, RepositoryError>> + Send;

    /// Insert a favorite unless the user already has it.
    fn insert_favorite_if_absent(
        &mut self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<MergeOutcome, RepositoryError>> + Send;

    /// Commit all writes.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Discard all writes.
    fn rollback(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Product availability lookups.
pub trait Catalog: Send + Sync {
    /// Whether `quantity` units of the variant can be ordered right now.
    fn check_availability(
        &self,
        variant_id: &VariantId,
        quantity: u32,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Catalog details for the given variants. Unknown ids are left out.
    fn variant_details(
        &self,
        variant_ids: &[VariantId],
    ) -> impl Future<Output = Result<Vec<VariantDetails>, RepositoryError>> + Send;
}
