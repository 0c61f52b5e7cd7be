//! In-process counter store for single-instance deployments and tests.

use super::store::{CounterError, CounterResult, CounterStore};
use crate::domain::keys;
use crate::domain::sketch::{DEFAULT_PRECISION, Sketch};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

enum Value {
    Counter(i64),
    Hash(HashMap<String, i64>),
    Sketch(Sketch),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// How often a full scan drops expired keys that are never touched again.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Key map with lazy expiry: an expired key is dropped when it is next touched,
/// and everything else that expired is swept at most once per [`PURGE_INTERVAL`].
struct Keyspace {
    map: HashMap<String, Entry>,
    next_purge: Instant,
}

impl Keyspace {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            next_purge: Instant::now() + PURGE_INTERVAL,
        }
    }

    fn purge_if_due(&mut self, now: Instant) {
        if now < self.next_purge {
            return;
        }

        let before = self.map.len();
        self.map.retain(|_, entry| !entry.is_expired(now));
        self.next_purge = now + PURGE_INTERVAL;

        let purged = before - self.map.len();
        if purged > 0 {
            debug!(purged, remaining = self.map.len(), "Expired counter keys purged");
        }
    }

    fn expire(&mut self, key: &str) {
        let now = Instant::now();
        if self.map.get(key).is_some_and(|entry| entry.is_expired(now)) {
            self.map.remove(key);
        }
    }

    fn get(&mut self, key: &str) -> Option<&Entry> {
        self.expire(key);
        self.map.get(key)
    }

    fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> Entry) -> &mut Entry {
        self.expire(key);
        self.map.entry(key.to_string()).or_insert_with(default)
    }

    fn insert(&mut self, key: String, entry: Entry) {
        self.map.insert(key, entry);
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }
}

/// Counter store keeping every key in a process-local map.
///
/// Mirrors the Redis keyspace and expiry rules; sketches use [`Sketch`] and dump to
/// its byte format.
pub struct MemoryCounterStore {
    keyspace: Mutex<Keyspace>,
    daily_ttl: Duration,
}

impl MemoryCounterStore {
    pub fn new(daily_ttl_seconds: u64) -> Self {
        Self {
            keyspace: Mutex::new(Keyspace::new()),
            daily_ttl: Duration::from_secs(daily_ttl_seconds),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Keyspace> {
        let mut keyspace = self.keyspace.lock().unwrap_or_else(|e| e.into_inner());
        keyspace.purge_if_due(Instant::now());
        keyspace
    }

    fn daily_expiry(&self) -> Option<Instant> {
        Some(Instant::now() + self.daily_ttl)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries().get(key).is_some()
    }

    /// Keys held in memory, expired or not.
    #[cfg(test)]
    fn stored_keys(&self) -> usize {
        self.keyspace
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map
            .len()
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COUNTER_TTL_SECONDS)
    }
}

fn sketch_mut<'a>(entries: &'a mut Keyspace, key: &str) -> CounterResult<&'a mut Sketch> {
    let entry =
        entries.get_or_insert_with(key, || Entry::persistent(Value::Sketch(Sketch::new())));

    match &mut entry.value {
        Value::Sketch(sketch) => Ok(sketch),
        _ => Err(CounterError::WrongType(key.to_string())),
    }
}

fn sketch_estimate(entries: &mut Keyspace, key: &str) -> CounterResult<Option<i64>> {
    match entries.get(key).map(|e| &e.value) {
        None => Ok(None),
        Some(Value::Sketch(sketch)) => Ok(Some(sketch.estimate() as i64)),
        Some(_) => Err(CounterError::WrongType(key.to_string())),
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment_daily_pv(&self, code: &str, day: NaiveDate) -> CounterResult<()> {
        let key = keys::daily_pv_key(day);
        let expires_at = self.daily_expiry();
        let mut entries = self.entries();

        let entry =
            entries.get_or_insert_with(&key, || Entry::persistent(Value::Hash(HashMap::new())));

        match &mut entry.value {
            Value::Hash(fields) => *fields.entry(code.to_string()).or_insert(0) += 1,
            _ => return Err(CounterError::WrongType(key)),
        }

        entry.expires_at = expires_at;
        Ok(())
    }

    async fn add_daily_uv(&self, code: &str, day: NaiveDate, visitor: &str) -> CounterResult<()> {
        let key = keys::daily_uv_key(code, day);
        let expires_at = self.daily_expiry();
        let mut entries = self.entries();

        sketch_mut(&mut entries, &key)?.add(visitor.as_bytes());

        if let Some(entry) = entries.map.get_mut(&key) {
            entry.expires_at = expires_at;
        }
        Ok(())
    }

    async fn increment_total_pv(&self, code: &str) -> CounterResult<()> {
        let key = keys::total_pv_key(code);
        let mut entries = self.entries();

        let entry = entries.get_or_insert_with(&key, || Entry::persistent(Value::Counter(0)));

        match &mut entry.value {
            Value::Counter(n) => *n += 1,
            _ => return Err(CounterError::WrongType(key)),
        }
        Ok(())
    }

    async fn add_total_uv(&self, code: &str, visitor: &str) -> CounterResult<()> {
        let key = keys::total_uv_key(code);
        let mut entries = self.entries();
        sketch_mut(&mut entries, &key)?.add(visitor.as_bytes());
        Ok(())
    }

    async fn get_daily_pv(&self, code: &str, day: NaiveDate) -> CounterResult<i64> {
        let key = keys::daily_pv_key(day);
        let mut entries = self.entries();

        match entries.get(&key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::Hash(fields)) => Ok(fields.get(code).copied().unwrap_or(0)),
            Some(_) => Err(CounterError::WrongType(key)),
        }
    }

    async fn get_daily_uv(&self, code: &str, day: NaiveDate) -> CounterResult<i64> {
        let mut entries = self.entries();
        Ok(sketch_estimate(&mut entries, &keys::daily_uv_key(code, day))?.unwrap_or(0))
    }

    async fn get_total_pv(&self, code: &str) -> CounterResult<Option<i64>> {
        let key = keys::total_pv_key(code);
        let mut entries = self.entries();

        match entries.get(&key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Counter(n)) => Ok(Some(*n)),
            Some(_) => Err(CounterError::WrongType(key)),
        }
    }

    async fn get_total_uv(&self, code: &str) -> CounterResult<Option<i64>> {
        let mut entries = self.entries();
        sketch_estimate(&mut entries, &keys::total_uv_key(code))
    }

    async fn set_total_pv(&self, code: &str, value: i64) -> CounterResult<()> {
        self.entries().insert(
            keys::total_pv_key(code),
            Entry::persistent(Value::Counter(value)),
        );
        Ok(())
    }

    async fn dump_sketch(&self, key: &str) -> CounterResult<Option<Vec<u8>>> {
        let mut entries = self.entries();

        match entries.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Sketch(sketch)) => Ok(Some(sketch.to_bytes())),
            Some(_) => Err(CounterError::WrongType(key.to_string())),
        }
    }

    async fn restore_sketch(&self, key: &str, bytes: &[u8]) -> CounterResult<()> {
        let sketch = Sketch::from_bytes(bytes)?;
        sketch.ensure_precision(DEFAULT_PRECISION)?;

        self.entries()
            .insert(key.to_string(), Entry::persistent(Value::Sketch(sketch)));
        Ok(())
    }

    async fn init_sketch(&self, key: &str) -> CounterResult<()> {
        let mut entries = self.entries();
        sketch_mut(&mut entries, key)?;
        Ok(())
    }

    async fn delete_keys(&self, keys: &[String]) -> CounterResult<()> {
        let mut entries = self.entries();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
