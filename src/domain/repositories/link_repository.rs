//! Repository trait for short link data access.

use crate::domain::entities::{LinkFilter, NewShortLink, ShortLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for managing short links.
///
/// The durable store is the source of truth for every link; caches and counters
/// are rebuilt from it.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Creates a new short link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the short code already exists.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ShortLink>, AppError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError>;

    /// Finds a link by code only if it is enabled.
    ///
    /// This is the lookup used on the redirect path: a disabled link is
    /// indistinguishable from a missing one.
    async fn find_enabled_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError>;

    /// Lists links matching `filter`, newest first.
    async fn list(
        &self,
        filter: LinkFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ShortLink>, AppError>;

    async fn count(&self, filter: LinkFilter) -> Result<i64, AppError>;

    /// Every link, ordered by id. Used by the reconciliation sweep.
    async fn list_all(&self) -> Result<Vec<ShortLink>, AppError>;

    /// Persists all mutable fields of `link`.
    ///
    /// The write only applies if the stored `version` still equals `link.version`;
    /// on success the stored version is bumped and `updated_at` set to now.
    /// Cumulative totals only move up: a copy read before a reconciliation cannot
    /// lower what that reconciliation wrote.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the link was modified concurrently and
    /// [`AppError::NotFound`] if it no longer exists.
    async fn update(&self, link: &ShortLink) -> Result<ShortLink, AppError>;

    /// Deletes the link and all its daily statistics in one transaction.
    ///
    /// Returns the deleted link, or `None` if it did not exist.
    async fn delete_with_stats(&self, id: i64) -> Result<Option<ShortLink>, AppError>;
}
