//! Request and response shapes for the management API.
//!
//! JSON bodies and query strings are camelCase. Request types derive
//! `validator::Validate`; business rules (code syntax, reserved codes, redirect
//! codes) are enforced again in the services.

pub mod health;
pub mod links;
pub mod pagination;
pub mod stats;
