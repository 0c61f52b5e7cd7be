//! Request-independent helpers.
//!
//! - [`validation`] - Short code, destination and redirect code rules
//! - [`client_ip`] - Visitor address extraction

pub mod client_ip;
pub mod validation;
