//! CLI subcommands.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `STOREFRONT_REDIS_URL` (or `REDIS_URL`) - Redis holding guest state

pub mod guest;
pub mod migrate;
pub mod transfer;

use basket_storefront::kv::{KvError, RedisStore};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Key-value store error.
    #[error("Store error: {0}")]
    Store(#[from] KvError),

    /// Service operation failed.
    #[error("Service error: {0}")]
    Service(#[from] basket_storefront::services::ServiceError),

    /// Output could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read the first of `names` that is set.
fn env_secret(names: &[&'static str]) -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();
    names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .map(SecretString::from)
        .ok_or(CommandError::MissingEnvVar(
            names.first().copied().unwrap_or("DATABASE_URL"),
        ))
}

/// Connect to the storefront database.
async fn connect_database() -> Result<PgPool, CommandError> {
    let url = env_secret(&["STOREFRONT_DATABASE_URL", "DATABASE_URL"])?;
    tracing::info!("Connecting to storefront database...");
    Ok(basket_storefront::db::create_pool(&url).await?)
}

/// Connect to the guest state store.
async fn connect_store() -> Result<RedisStore, CommandError> {
    let url = env_secret(&["STOREFRONT_REDIS_URL", "REDIS_URL"])?;
    tracing::info!("Connecting to Redis...");
    Ok(RedisStore::connect(&url).await?)
}

/// Print a JSON document to stdout.
fn print_json(value: &serde_json::Value) -> Result<(), CommandError> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
