//! Counter store trait and error types.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::sketch::SketchError;

/// Errors that can occur during counter store operations.
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Counter store connection error: {0}")]
    Connection(String),

    #[error("Counter store operation error: {0}")]
    Backend(String),

    #[error("Invalid sketch data: {0}")]
    Sketch(#[from] SketchError),

    #[error("Key {0} holds a value of the wrong type")]
    WrongType(String),
}

impl From<redis::RedisError> for CounterError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            CounterError::Connection(e.to_string())
        } else {
            CounterError::Backend(e.to_string())
        }
    }
}

/// Result type for counter store operations.
pub type CounterResult<T> = Result<T, CounterError>;

/// Typed analytics counters over a fast key-value store.
///
/// Keys follow [`crate::domain::keys`]. Every individual operation is atomic at the
/// store level; callers treat failures as best-effort and log them.
///
/// # Implementations
///
/// - [`crate::infrastructure::counters::RedisCounterStore`] - native Redis hashes and HyperLogLogs
/// - [`crate::infrastructure::counters::MemoryCounterStore`] - in-process, single instance
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increments the link's field in the daily page-view hash and refreshes its expiry.
    async fn increment_daily_pv(&self, code: &str, day: NaiveDate) -> CounterResult<()>;

    /// Adds a visitor to the link's daily sketch and refreshes its expiry.
    async fn add_daily_uv(&self, code: &str, day: NaiveDate, visitor: &str) -> CounterResult<()>;

    async fn increment_total_pv(&self, code: &str) -> CounterResult<()>;

    async fn add_total_uv(&self, code: &str, visitor: &str) -> CounterResult<()>;

    /// Page views recorded on `day`; 0 when nothing was recorded.
    async fn get_daily_pv(&self, code: &str, day: NaiveDate) -> CounterResult<i64>;

    /// Unique-visitor estimate for `day`; 0 when the sketch does not exist.
    async fn get_daily_uv(&self, code: &str, day: NaiveDate) -> CounterResult<i64>;

    /// Cumulative page views, or `None` when the counter key does not exist.
    async fn get_total_pv(&self, code: &str) -> CounterResult<Option<i64>>;

    /// Cumulative unique-visitor estimate, or `None` when the sketch does not exist.
    async fn get_total_uv(&self, code: &str) -> CounterResult<Option<i64>>;

    /// Overwrites the cumulative page-view counter (no expiry).
    async fn set_total_pv(&self, code: &str, value: i64) -> CounterResult<()>;

    /// Serialized sketch state, or `None` if the key does not exist.
    async fn dump_sketch(&self, key: &str) -> CounterResult<Option<Vec<u8>>>;

    /// Replaces whatever is stored at `key` with the dumped sketch, atomically.
    async fn restore_sketch(&self, key: &str, bytes: &[u8]) -> CounterResult<()>;

    /// Ensures an (empty) sketch exists at `key`. Existing sketches are left intact.
    async fn init_sketch(&self, key: &str) -> CounterResult<()>;

    async fn delete_keys(&self, keys: &[String]) -> CounterResult<()>;

    async fn health_check(&self) -> bool;
}
