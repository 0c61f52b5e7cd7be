//! Redirect cache trait and error types.

use crate::domain::entities::ShortLink;
use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    #[error("Cache operation error: {0}")]
    OperationError(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            CacheError::ConnectionError(e.to_string())
        } else {
            CacheError::OperationError(e.to_string())
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A cached record for an enabled link.
    Present(ShortLink),
    /// The code was recently found to be missing or disabled.
    NegativeHit,
    /// Nothing usable is cached.
    Miss,
}

/// Marker stored for codes known not to resolve.
pub(crate) const NEGATIVE_MARKER: &str = "";

/// Interprets a raw cached value.
///
/// An undecodable value is logged and reported as a miss so the caller falls back
/// to the database and overwrites it.
pub(crate) fn decode_entry(code: &str, raw: Option<String>) -> CacheLookup {
    match raw {
        None => CacheLookup::Miss,
        Some(raw) if raw == NEGATIVE_MARKER => CacheLookup::NegativeHit,
        Some(raw) => match serde_json::from_str::<ShortLink>(&raw) {
            Ok(link) => CacheLookup::Present(link),
            Err(e) => {
                warn!(code, error = %e, "Discarding undecodable cache entry");
                CacheLookup::Miss
            }
        },
    }
}

/// Cache-aside store for resolved short links.
///
/// Entries live under `redirect:shortcode:{code}`. Callers treat every error as a
/// miss; the cache is never the source of truth.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process cache for a single instance
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedirectCache: Send + Sync {
    /// Looks up the cached state of a code.
    async fn lookup(&self, code: &str) -> CacheResult<CacheLookup>;

    /// Caches an enabled link for `ttl_seconds`.
    async fn store(&self, code: &str, link: &ShortLink, ttl_seconds: u64) -> CacheResult<()>;

    /// Caches the fact that `code` does not resolve.
    async fn store_negative(&self, code: &str, ttl_seconds: u64) -> CacheResult<()>;

    /// Removes any entry for `code`, positive or negative.
    async fn invalidate(&self, code: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
