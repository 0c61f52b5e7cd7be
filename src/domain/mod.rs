//! Domain layer containing business entities and logic.
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`keys`] - Key naming for the cache and counter keyspace
//! - [`sketch`] - HyperLogLog unique-visitor sketch
//! - [`visit_event`] - Visit event model
//! - [`visit_worker`] - Asynchronous visit recording worker
//!
//! # Visit Processing Flow
//!
//! 1. The redirect resolver finds an enabled link
//! 2. A [`visit_event::VisitEvent`] is sent to a bounded channel
//! 3. [`visit_worker::run_visit_worker`] applies the counter updates
//! 4. The reconciliation job later flushes counters into the database

pub mod entities;
pub mod keys;
pub mod repositories;
pub mod sketch;
pub mod visit_event;
pub mod visit_worker;
