//! In-process [`KvStore`] for tests and local development.
//!
//! Mirrors the Redis semantics the guest services depend on, including lazy
//! key expiry. Time comes from `tokio::time`, so tests can pause and advance
//! the clock to exercise TTLs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use tokio::time::Instant;

use super::{KvError, KvStore};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
}

impl Value {
    fn is_empty(&self) -> bool {
        match self {
            Self::Str(_) => false,
            Self::Hash(hash) => hash.is_empty(),
            Self::Set(set) => set.is_empty(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A process-local key-value store.
///
/// Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
    offline: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command fail with [`KvError::Unavailable`]
    /// (or succeed again when `false`). Used to simulate an outage.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make `DEL` alone fail with [`KvError::Unavailable`] while every other
    /// command keeps working.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    /// Whether the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), KvError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("memory store is offline".to_owned()));
        }
        Ok(())
    }

    /// Drop `key` if it has expired.
    fn purge(&self, key: &str) {
        let now = Instant::now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    /// Live entry for `key`, if any.
    fn live(&self, key: &str) -> Result<Option<RefMut<'_, String, Entry>>, KvError> {
        self.check_online()?;
        self.purge(key);
        Ok(self.entries.get_mut(key))
    }

    /// Remove `key` if its collection became empty.
    fn drop_if_empty(&self, key: &str) {
        self.entries.remove_if(key, |_, entry| entry.value.is_empty());
    }

    /// Run `f` against the hash at `key`, creating it when `create` is set.
    fn with_hash<T>(
        &self,
        key: &str,
        create: bool,
        f: impl FnOnce(&mut HashMap<String, String>) -> Result<T, KvError>,
        missing: T,
    ) -> Result<T, KvError> {
        self.check_online()?;
        self.purge(key);
        let result = if create {
            let mut entry = self.entries.entry(key.to_owned()).or_insert_with(|| Entry {
                value: Value::Hash(HashMap::new()),
                expires_at: None,
            });
            match &mut entry.value {
                Value::Hash(hash) => f(hash),
                _ => Err(KvError::WrongType(key.to_owned())),
            }
        } else {
            match self.entries.get_mut(key) {
                Some(mut entry) => match &mut entry.value {
                    Value::Hash(hash) => f(hash),
                    _ => Err(KvError::WrongType(key.to_owned())),
                },
                None => Ok(missing),
            }
        };
        self.drop_if_empty(key);
        result
    }

    /// Run `f` against the set at `key`, creating it when `create` is set.
    fn with_set<T>(
        &self,
        key: &str,
        create: bool,
        f: impl FnOnce(&mut HashSet<String>) -> T,
        missing: T,
    ) -> Result<T, KvError> {
        self.check_online()?;
        self.purge(key);
        let result = if create {
            let mut entry = self.entries.entry(key.to_owned()).or_insert_with(|| Entry {
                value: Value::Set(HashSet::new()),
                expires_at: None,
            });
            match &mut entry.value {
                Value::Set(set) => Ok(f(set)),
                _ => Err(KvError::WrongType(key.to_owned())),
            }
        } else {
            match self.entries.get_mut(key) {
                Some(mut entry) => match &mut entry.value {
                    Value::Set(set) => Ok(f(set)),
                    _ => Err(KvError::WrongType(key.to_owned())),
                },
                None => Ok(missing),
            }
        };
        self.drop_if_empty(key);
        result
    }
}

impl KvStore for MemoryStore {
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), KvError> {
        self.with_hash(
            key,
            true,
            |hash| {
                hash.insert(field.to_owned(), value.to_owned());
                Ok(())
            },
            (),
        )
    }

    async fn hsetnx(&self, key: &str, field: &str, value: &str) -> Result<bool, KvError> {
        self.with_hash(
            key,
            true,
            |hash| {
                if hash.contains_key(field) {
                    return Ok(false);
                }
                hash.insert(field.to_owned(), value.to_owned());
                Ok(true)
            },
            false,
        )
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, KvError> {
        self.with_hash(key, false, |hash| Ok(hash.get(field).cloned()), None)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, KvError> {
        self.with_hash(key, false, |hash| Ok(hash.clone()), HashMap::new())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, KvError> {
        self.with_hash(key, false, |hash| Ok(hash.remove(field).is_some()), false)
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, KvError> {
        self.with_hash(
            key,
            true,
            |hash| {
                let current = match hash.get(field) {
                    Some(raw) => raw.parse::<i64>().map_err(|_| KvError::NotAnInteger {
                        key: key.to_owned(),
                        field: field.to_owned(),
                    })?,
                    None => 0,
                };
                let next = current + delta;
                hash.insert(field.to_owned(), next.to_string());
                Ok(next)
            },
            0,
        )
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, KvError> {
        self.with_set(key, true, |set| set.insert(member.to_owned()), false)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, KvError> {
        self.with_set(key, false, |set| set.remove(member), false)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError> {
        self.with_set(key, false, |set| set.iter().cloned().collect(), Vec::new())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, KvError> {
        self.with_set(key, false, |set| set.contains(member), false)
    }

    async fn scard(&self, key: &str) -> Result<u64, KvError> {
        self.with_set(key, false, |set| set.len() as u64, 0)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match self.live(key)? {
            Some(entry) => match &entry.value {
                Value::Str(value) => Ok(Some(value.clone())),
                _ => Err(KvError::WrongType(key.to_owned())),
            },
            None => Ok(None),
        }
    }

    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.check_online()?;
        self.entries.insert(
            key.to_owned(),
            Entry {
                value: Value::Str(value.to_owned()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        self.check_online()?;
        self.purge(key);
        let mut written = false;
        self.entries.entry(key.to_owned()).or_insert_with(|| {
            written = true;
            Entry {
                value: Value::Str(value.to_owned()),
                expires_at: Some(Instant::now() + ttl),
            }
        });
        Ok(written)
    }

    async fn del(&self, keys: &[&str]) -> Result<u64, KvError> {
        self.check_online()?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("memory store is rejecting deletes".to_owned()));
        }
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|key| self.entries.remove(*key))
            .filter(|(_, entry)| !entry.is_expired(now))
            .count();
        Ok(removed as u64)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        match self.live(key)? {
            Some(mut entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError> {
        let now = Instant::now();
        Ok(self
            .live(key)?
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn ping(&self) -> Result<(), KvError> {
        self.check_online()
    }
}
