//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{PgCartStore, PgCatalog};
use crate::kv::KvBackend;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    kv: KvBackend,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    /// * `kv` - Key-value store holding guest state
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool, kv: KvBackend) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pool, kv }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the key-value store.
    #[must_use]
    pub fn kv(&self) -> &KvBackend {
        &self.inner.kv
    }

    /// Cart and favorite repository over the pool.
    #[must_use]
    pub fn cart_store(&self) -> PgCartStore<'_> {
        PgCartStore::new(&self.inner.pool)
    }

    /// Catalog repository over the pool.
    #[must_use]
    pub fn catalog(&self) -> PgCatalog<'_> {
        PgCatalog::new(&self.inner.pool)
    }
}
