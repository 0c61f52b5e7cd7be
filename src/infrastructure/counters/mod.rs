//! Analytics counters: exact page views and approximate unique visitors.
//!
//! Provides a [`CounterStore`] trait with two implementations:
//! - [`RedisCounterStore`] - Redis hashes, counters and HyperLogLogs
//! - [`MemoryCounterStore`] - In-process store for a single instance

mod memory_counters;
mod redis_counters;
mod store;

pub use memory_counters::MemoryCounterStore;
pub use redis_counters::RedisCounterStore;
pub use store::{CounterError, CounterResult, CounterStore};

#[cfg(test)]
pub use store::MockCounterStore;
