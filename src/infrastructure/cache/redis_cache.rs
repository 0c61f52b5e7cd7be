//! Redis-backed redirect cache.

use super::service::{CacheLookup, CacheResult, NEGATIVE_MARKER, RedirectCache, decode_entry};
use crate::domain::entities::ShortLink;
use crate::domain::keys;
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::debug;

/// Redis cache for fast short code lookups.
///
/// Shares the [`ConnectionManager`] with the counter store; see
/// [`crate::infrastructure::connect_redis`].
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RedirectCache for RedisCache {
    async fn lookup(&self, code: &str) -> CacheResult<CacheLookup> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(keys::short_code_key(code)).await?;

        let lookup = decode_entry(code, raw);
        debug!(code, ?lookup, "Cache lookup");
        Ok(lookup)
    }

    async fn store(&self, code: &str, link: &ShortLink, ttl_seconds: u64) -> CacheResult<()> {
        let payload = serde_json::to_string(link)?;
        let mut conn = self.conn.clone();

        conn.set_ex::<_, _, ()>(keys::short_code_key(code), payload, ttl_seconds)
            .await?;

        debug!(code, ttl_seconds, "Cache SET");
        Ok(())
    }

    async fn store_negative(&self, code: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.conn.clone();

        conn.set_ex::<_, _, ()>(keys::short_code_key(code), NEGATIVE_MARKER, ttl_seconds)
            .await?;

        debug!(code, ttl_seconds, "Cache SET negative");
        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(keys::short_code_key(code)).await?;

        if deleted > 0 {
            debug!(code, "Cache INVALIDATE");
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.conn.clone();
        conn.ping::<()>().await.is_ok()
    }
}
