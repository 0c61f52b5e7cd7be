//! Cache-aside short code resolution.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::domain::entities::ShortLink;
use crate::domain::keys;
use crate::domain::repositories::LinkRepository;
use crate::domain::visit_event::VisitEvent;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheLookup, RedirectCache};
use crate::utils::validation::is_valid_short_code;

/// Cache lifetimes used by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    pub cache_ttl_seconds: u64,
    pub negative_cache_ttl_seconds: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: crate::config::DEFAULT_CACHE_TTL_SECONDS,
            negative_cache_ttl_seconds: crate::config::DEFAULT_NEGATIVE_CACHE_TTL_SECONDS,
        }
    }
}

/// Resolves short codes to links and dispatches visits.
///
/// The lookup order is cache, then database. Codes that do not resolve (missing or
/// disabled) are cached negatively so repeated probes do not reach the database.
/// Every successful resolution sends exactly one [`VisitEvent`]; the event is
/// handed to a bounded queue and never awaited.
pub struct RedirectService<L: LinkRepository + ?Sized> {
    link_repository: Arc<L>,
    cache: Arc<dyn RedirectCache>,
    visit_tx: mpsc::Sender<VisitEvent>,
    settings: ResolverSettings,
}

impl<L: LinkRepository + ?Sized> RedirectService<L> {
    pub fn new(
        link_repository: Arc<L>,
        cache: Arc<dyn RedirectCache>,
        visit_tx: mpsc::Sender<VisitEvent>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            link_repository,
            cache,
            visit_tx,
            settings,
        }
    }

    /// Resolves `code` for a visitor identified by `client_address`.
    ///
    /// Returns `Ok(None)` for codes that are syntactically invalid, unknown or
    /// disabled. Invalid codes are rejected before any store is consulted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the database lookup fails. Cache failures
    /// are logged and treated as misses.
    pub async fn resolve(
        &self,
        code: &str,
        client_address: &str,
    ) -> Result<Option<ShortLink>, AppError> {
        if !is_valid_short_code(code) {
            debug!(code, "Rejected malformed short code");
            return Ok(None);
        }

        let lookup = match self.cache.lookup(code).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(code, error = %e, "Cache lookup failed, falling back to database");
                CacheLookup::Miss
            }
        };

        let link = match lookup {
            CacheLookup::Present(link) => {
                counter!("redirect_cache_lookups_total", "outcome" => "hit").increment(1);
                link
            }
            CacheLookup::NegativeHit => {
                counter!("redirect_cache_lookups_total", "outcome" => "negative").increment(1);
                return Ok(None);
            }
            CacheLookup::Miss => {
                counter!("redirect_cache_lookups_total", "outcome" => "miss").increment(1);

                match self.link_repository.find_enabled_by_code(code).await? {
                    Some(link) => {
                        self.cache_positive(code, &link).await;
                        link
                    }
                    None => {
                        self.cache_negative(code).await;
                        return Ok(None);
                    }
                }
            }
        };

        self.dispatch_visit(code, client_address);
        Ok(Some(link))
    }

    async fn cache_positive(&self, code: &str, link: &ShortLink) {
        if let Err(e) = self
            .cache
            .store(code, link, self.settings.cache_ttl_seconds)
            .await
        {
            warn!(code, error = %e, "Failed to cache link");
        }
    }

    async fn cache_negative(&self, code: &str) {
        if let Err(e) = self
            .cache
            .store_negative(code, self.settings.negative_cache_ttl_seconds)
            .await
        {
            warn!(code, error = %e, "Failed to cache negative entry");
        }
    }

    fn dispatch_visit(&self, code: &str, client_address: &str) {
        let event = VisitEvent::new(code, client_address, keys::today());

        match self.visit_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                counter!("redirect_visits_dropped_total").increment(1);
                warn!(code, "Visit queue full, dropping visit");
            }
            Err(TrySendError::Closed(_)) => {
                counter!("redirect_visits_dropped_total").increment(1);
                warn!(code, "Visit queue closed, dropping visit");
            }
        }
    }
}
