//! Application layer services implementing business logic.
//!
//! Services coordinate the durable store (through repository traits) with the
//! redirect cache and the counter store. The database is always written first;
//! cache and counter maintenance after it is best-effort.
//!
//! # Available Services
//!
//! - [`services::RedirectService`] - Code resolution and visit dispatch
//! - [`services::SyncService`] - Enable, disable, update and delete
//! - [`services::ReconcileService`] - Counter flush into the database
//! - [`services::LinkService`] - Link creation and listing
//! - [`services::StatsService`] - Reconciled statistics

pub mod services;
