//! Redis-backed counter store using native hashes and HyperLogLogs.

use super::store::{CounterResult, CounterStore};
use crate::domain::keys;
use async_trait::async_trait;
use chrono::NaiveDate;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::debug;

/// Counter store over Redis.
///
/// Daily writes are sent as `MULTI` pipelines so the increment and the expiry
/// refresh land together. Sketch dumps use Redis' own `DUMP` serialization, so a
/// backup taken here can only be restored into Redis.
pub struct RedisCounterStore {
    conn: ConnectionManager,
    daily_ttl_seconds: i64,
}

impl RedisCounterStore {
    pub fn new(conn: ConnectionManager, daily_ttl_seconds: u64) -> Self {
        Self {
            conn,
            daily_ttl_seconds: daily_ttl_seconds as i64,
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_daily_pv(&self, code: &str, day: NaiveDate) -> CounterResult<()> {
        let key = keys::daily_pv_key(day);
        let mut conn = self.conn.clone();

        redis::pipe()
            .atomic()
            .hincr(&key, code, 1)
            .ignore()
            .expire(&key, self.daily_ttl_seconds)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn add_daily_uv(&self, code: &str, day: NaiveDate, visitor: &str) -> CounterResult<()> {
        let key = keys::daily_uv_key(code, day);
        let mut conn = self.conn.clone();

        redis::pipe()
            .atomic()
            .pfadd(&key, visitor)
            .ignore()
            .expire(&key, self.daily_ttl_seconds)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn increment_total_pv(&self, code: &str) -> CounterResult<()> {
        let mut conn = self.conn.clone();
        conn.incr::<_, _, i64>(keys::total_pv_key(code), 1).await?;
        Ok(())
    }

    async fn add_total_uv(&self, code: &str, visitor: &str) -> CounterResult<()> {
        let mut conn = self.conn.clone();
        conn.pfadd::<_, _, i64>(keys::total_uv_key(code), visitor)
            .await?;
        Ok(())
    }

    async fn get_daily_pv(&self, code: &str, day: NaiveDate) -> CounterResult<i64> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.hget(keys::daily_pv_key(day), code).await?;
        Ok(value.unwrap_or(0))
    }

    async fn get_daily_uv(&self, code: &str, day: NaiveDate) -> CounterResult<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.pfcount(keys::daily_uv_key(code, day)).await?;
        Ok(value)
    }

    async fn get_total_pv(&self, code: &str) -> CounterResult<Option<i64>> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(keys::total_pv_key(code)).await?;
        Ok(value)
    }

    async fn get_total_uv(&self, code: &str) -> CounterResult<Option<i64>> {
        let key = keys::total_uv_key(code);
        let mut conn = self.conn.clone();

        let (exists, count): (bool, i64) = redis::pipe()
            .exists(&key)
            .pfcount(&key)
            .query_async(&mut conn)
            .await?;

        Ok(exists.then_some(count))
    }

    async fn set_total_pv(&self, code: &str, value: i64) -> CounterResult<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(keys::total_pv_key(code), value).await?;
        Ok(())
    }

    async fn dump_sketch(&self, key: &str) -> CounterResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let dumped: Option<Vec<u8>> = redis::cmd("DUMP").arg(key).query_async(&mut conn).await?;

        debug!(key, present = dumped.is_some(), "Sketch dumped");
        Ok(dumped)
    }

    async fn restore_sketch(&self, key: &str, bytes: &[u8]) -> CounterResult<()> {
        let mut conn = self.conn.clone();

        redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .cmd("RESTORE")
            .arg(key)
            .arg(0)
            .arg(bytes)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        debug!(key, "Sketch restored");
        Ok(())
    }

    async fn init_sketch(&self, key: &str) -> CounterResult<()> {
        let mut conn = self.conn.clone();
        // PFADD without elements creates an empty HyperLogLog if the key is absent.
        redis::cmd("PFADD")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_keys(&self, keys: &[String]) -> CounterResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(keys.to_vec()).await?;

        debug!(requested = keys.len(), deleted, "Counter keys deleted");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.conn.clone();
        conn.ping::<()>().await.is_ok()
    }
}
