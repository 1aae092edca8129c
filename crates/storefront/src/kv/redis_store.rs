//! Redis-backed [`KvStore`].

use std::collections::HashMap;
use std::time::Duration;

use redis::Client;
use redis::aio::ConnectionManager;
use secrecy::{ExposeSecret, SecretString};

use super::{KvError, KvStore};

/// Redis store over a reconnecting [`ConnectionManager`].
///
/// Cloning is cheap; all clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `KvError::Redis` if the URL is invalid or the initial
    /// connection cannot be established.
    pub async fn connect(redis_url: &SecretString) -> Result<Self, KvError> {
        let client = Client::open(redis_url.expose_secret())?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }

    fn conn(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

/// Whole seconds for an `EX`/`EXPIRE` argument, never below one.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

impl KvStore for RedisStore {
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), KvError> {
        let _: i64 = redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn hsetnx(&self, key: &str, field: &str, value: &str) -> Result<bool, KvError> {
        let written: bool = redis::cmd("HSETNX")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async(&mut self.conn())
            .await?;
        Ok(written)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, KvError> {
        let value: Option<String> = redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut self.conn())
            .await?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, KvError> {
        let map: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(map)
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, KvError> {
        let removed: u64 = redis::cmd("HDEL")
            .arg(key)
            .arg(field)
            .query_async(&mut self.conn())
            .await?;
        Ok(removed > 0)
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, KvError> {
        let value: i64 = redis::cmd("HINCRBY")
            .arg(key)
            .arg(field)
            .arg(delta)
            .query_async(&mut self.conn())
            .await?;
        Ok(value)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, KvError> {
        let added: u64 = redis::cmd("SADD")
            .arg(key)
            .arg(member)
            .query_async(&mut self.conn())
            .await?;
        Ok(added > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, KvError> {
        let removed: u64 = redis::cmd("SREM")
            .arg(key)
            .arg(member)
            .query_async(&mut self.conn())
            .await?;
        Ok(removed > 0)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError> {
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(members)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, KvError> {
        let present: bool = redis::cmd("SISMEMBER")
            .arg(key)
            .arg(member)
            .query_async(&mut self.conn())
            .await?;
        Ok(present)
    }

    async fn scard(&self, key: &str) -> Result<u64, KvError> {
        let count: u64 = redis::cmd("SCARD")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(value)
    }

    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let _: String = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut self.conn())
            .await?;
        Ok(reply.is_some())
    }

    async fn del(&self, keys: &[&str]) -> Result<u64, KvError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: u64 = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut self.conn())
            .await?;
        Ok(removed)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        let exists: bool = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs(ttl))
            .query_async(&mut self.conn())
            .await?;
        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError> {
        // -2: no such key, -1: no expiry
        let millis: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    async fn ping(&self) -> Result<(), KvError> {
        let _: String = redis::cmd("PING").query_async(&mut self.conn()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_secs_rounds_down_but_never_zero() {
        assert_eq!(ttl_secs(Duration::from_secs(432_000)), 432_000);
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 1);
        assert_eq!(ttl_secs(Duration::ZERO), 1);
    }
}
