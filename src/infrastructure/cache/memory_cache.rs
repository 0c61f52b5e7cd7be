//! In-process redirect cache.

use super::service::{CacheLookup, CacheResult, NEGATIVE_MARKER, RedirectCache, decode_entry};
use crate::domain::entities::ShortLink;
use crate::domain::keys;
use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Entries kept when no capacity is configured.
pub const DEFAULT_MEMORY_CACHE_CAPACITY: u64 = 100_000;

/// Serialized value plus the lifetime it was stored with.
#[derive(Clone)]
struct CachedEntry {
    payload: Arc<str>,
    ttl: Duration,
}

/// Per-entry expiry: positive and negative entries live for the TTL they were
/// stored with, and an overwrite restarts the clock.
struct EntryTtl;

impl Expiry<String, CachedEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded cache with the same serialized values and expiry semantics as
/// [`super::RedisCache`].
///
/// Expired entries are evicted by moka's housekeeping, and the entry count never
/// grows past the configured capacity, however many distinct codes are probed.
pub struct MemoryCache {
    inner: Cache<String, CachedEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CACHE_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();

        debug!(max_capacity, "Memory cache initialized");
        Self { inner }
    }

    async fn put(&self, code: &str, payload: String, ttl_seconds: u64) {
        let entry = CachedEntry {
            payload: payload.into(),
            ttl: Duration::from_secs(ttl_seconds),
        };
        self.inner.insert(keys::short_code_key(code), entry).await;
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RedirectCache for MemoryCache {
    async fn lookup(&self, code: &str) -> CacheResult<CacheLookup> {
        let raw = self
            .inner
            .get(&keys::short_code_key(code))
            .await
            .map(|entry| entry.payload.to_string());

        Ok(decode_entry(code, raw))
    }

    async fn store(&self, code: &str, link: &ShortLink, ttl_seconds: u64) -> CacheResult<()> {
        let payload = serde_json::to_string(link)?;
        self.put(code, payload, ttl_seconds).await;
        Ok(())
    }

    async fn store_negative(&self, code: &str, ttl_seconds: u64) -> CacheResult<()> {
        self.put(code, NEGATIVE_MARKER.to_string(), ttl_seconds).await;
        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        self.inner.invalidate(&keys::short_code_key(code)).await;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
