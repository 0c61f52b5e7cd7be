//! HTTP surface: the short-code redirect, the `/api/shortlink` management
//! endpoints and the health check.
//!
//! Handlers stay thin. They extract and validate input, call one service method
//! and map the result to JSON or a redirect response; every failure leaves as an
//! [`crate::error::AppError`].

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
