//! Caching layer for fast redirect lookups.
//!
//! Provides a [`RedirectCache`] trait with two implementations:
//! - [`RedisCache`] - Production Redis-backed cache
//! - [`MemoryCache`] - In-process cache for single-instance runs and tests

mod memory_cache;
mod redis_cache;
mod service;

pub use memory_cache::{DEFAULT_MEMORY_CACHE_CAPACITY, MemoryCache};
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheLookup, CacheResult, RedirectCache};

#[cfg(test)]
pub use service::MockRedirectCache;
