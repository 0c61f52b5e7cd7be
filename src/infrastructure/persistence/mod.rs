//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Short link storage, versioned updates, transactional delete
//! - [`PgStatsRepository`] - Daily statistics upserts and reconciled totals

pub mod pg_link_repository;
pub mod pg_stats_repository;

pub use pg_link_repository::PgLinkRepository;
pub use pg_stats_repository::PgStatsRepository;
