//! Infrastructure layer for external integrations.
//!
//! Implements the interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`cache`] - Redirect cache (Redis and in-memory implementations)
//! - [`counters`] - Page-view and unique-visitor counters (Redis and in-memory)
//! - [`persistence`] - PostgreSQL repository implementations

pub mod cache;
pub mod counters;
pub mod persistence;
mod redis_connection;

pub use redis_connection::connect_redis;
