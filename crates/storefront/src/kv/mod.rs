//! Key-value store access for guest state.
//!
//! Guest sessions, carts and favorites live in Redis, addressed purely by
//! string keys:
//!
//! | Key                              | Type   | TTL     |
//! |----------------------------------|--------|---------|
//! | `session:<session>`              | string | 7 days  |
//! | `cart:<session>`                 | hash   | 5 days  |
//! | `cart-added:<session>`           | hash   | 5 days  |
//! | `favorites:<session>`            | set    | 5 days  |
//! | `transfer-lock:<kind>:<session>` | string | 30 secs |
//!
//! Services are written against the [`KvStore`] trait so that the in-memory
//! [`MemoryStore`] can stand in for Redis in tests and local development.
//! [`KvBackend`] picks one of the two at startup.

pub mod memory;
pub mod redis_store;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// Errors that can occur talking to the key-value store.
#[derive(Debug, Error)]
pub enum KvError {
    /// Error returned by the Redis client (connection, timeout, protocol).
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// The store could not be reached.
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),

    /// The key holds a value of a different type (e.g. a set where a hash was expected).
    #[error("wrong value type at key {0}")]
    WrongType(String),

    /// A hash field that should hold an integer does not.
    #[error("value at {key}/{field} is not an integer")]
    NotAnInteger {
        /// Key of the hash.
        key: String,
        /// Field within the hash.
        field: String,
    },
}

/// The subset of Redis commands the guest services use.
///
/// Semantics follow Redis: writing a hash field or set member does not touch
/// the key's TTL, removing the last field or member deletes the key, and reads
/// of missing keys return empty values rather than errors.
pub trait KvStore: Send + Sync {
    /// `HSET key field value`.
    fn hset(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), KvError>> + Send;

    /// `HSETNX key field value`. Returns whether the field was written.
    fn hsetnx(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// `HGET key field`.
    fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<Option<String>, KvError>> + Send;

    /// `HGETALL key`.
    fn hgetall(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<HashMap<String, String>, KvError>> + Send;

    /// `HDEL key field`. Returns whether the field existed.
    fn hdel(&self, key: &str, field: &str) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// `HINCRBY key field delta`. Atomic; returns the new value.
    fn hincrby(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> impl Future<Output = Result<i64, KvError>> + Send;

    /// `SADD key member`. Returns whether the member was added.
    fn sadd(&self, key: &str, member: &str) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// `SREM key member`. Returns whether the member was present.
    fn srem(&self, key: &str, member: &str) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// `SMEMBERS key`.
    fn smembers(&self, key: &str) -> impl Future<Output = Result<Vec<String>, KvError>> + Send;

    /// `SISMEMBER key member`.
    fn sismember(
        &self,
        key: &str,
        member: &str,
    ) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// `SCARD key`.
    fn scard(&self, key: &str) -> impl Future<Output = Result<u64, KvError>> + Send;

    /// `GET key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, KvError>> + Send;

    /// `SET key value EX ttl`. Overwrites any value and resets the TTL.
    fn setex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), KvError>> + Send;

    /// `SET key value NX EX ttl`. Returns whether the key was set.
    fn set_nx_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// `DEL key [key ...]`. Returns the number of keys removed.
    fn del(&self, keys: &[&str]) -> impl Future<Output = Result<u64, KvError>> + Send;

    /// `EXPIRE key ttl`. Returns whether the key exists.
    fn expire(&self, key: &str, ttl: Duration) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// `PTTL key`. `None` when the key is missing or has no expiry.
    fn ttl(&self, key: &str) -> impl Future<Output = Result<Option<Duration>, KvError>> + Send;

    /// `PING`.
    fn ping(&self) -> impl Future<Output = Result<(), KvError>> + Send;
}

/// The key-value backend selected at startup.
#[derive(Clone)]
pub enum KvBackend {
    /// Redis via a reconnecting connection manager.
    Redis(RedisStore),
    /// Process-local store; state is lost on restart.
    Memory(MemoryStore),
}

impl KvBackend {
    /// Name of the backend for logs and health output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}

impl std::fmt::Debug for KvBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KvBackend").field(&self.name()).finish()
    }
}

/// Forward a [`KvStore`] call to whichever backend is active.
macro_rules! dispatch {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        match $self {
            Self::Redis(store) => store.$method($($arg),*).await,
            Self::Memory(store) => store.$method($($arg),*).await,
        }
    };
}

impl KvStore for KvBackend {
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), KvError> {
        dispatch!(self, hset(key, field, value))
    }

    async fn hsetnx(&self, key: &str, field: &str, value: &str) -> Result<bool, KvError> {
        dispatch!(self, hsetnx(key, field, value))
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, KvError> {
        dispatch!(self, hget(key, field))
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, KvError> {
        dispatch!(self, hgetall(key))
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, KvError> {
        dispatch!(self, hdel(key, field))
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, KvError> {
        dispatch!(self, hincrby(key, field, delta))
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, KvError> {
        dispatch!(self, sadd(key, member))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, KvError> {
        dispatch!(self, srem(key, member))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError> {
        dispatch!(self, smembers(key))
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, KvError> {
        dispatch!(self, sismember(key, member))
    }

    async fn scard(&self, key: &str) -> Result<u64, KvError> {
        dispatch!(self, scard(key))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        dispatch!(self, get(key))
    }

    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        dispatch!(self, setex(key, value, ttl))
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        dispatch!(self, set_nx_ex(key, value, ttl))
    }

    async fn del(&self, keys: &[&str]) -> Result<u64, KvError> {
        dispatch!(self, del(keys))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        dispatch!(self, expire(key, ttl))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError> {
        dispatch!(self, ttl(key))
    }

    async fn ping(&self) -> Result<(), KvError> {
        dispatch!(self, ping())
    }
}
