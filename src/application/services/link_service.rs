//! Link creation, lookup and listing service.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::entities::{LinkFilter, NewShortLink, ShortLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::validation::{validate_redirect_code, validate_short_code, validate_target_url};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// One page of a filtered link listing.
#[derive(Debug, Clone)]
pub struct LinkPage {
    pub items: Vec<ShortLink>,
    pub page: i64,
    pub size: i64,
    pub total: i64,
}

impl LinkPage {
    pub fn total_pages(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            (self.total + self.size - 1) / self.size
        }
    }
}

/// Service for authoring and browsing short links.
pub struct LinkService<L: LinkRepository + ?Sized> {
    link_repository: Arc<L>,
}

impl<L: LinkRepository + ?Sized> LinkService<L> {
    /// Creates a new link service.
    pub fn new(link_repository: Arc<L>) -> Self {
        Self { link_repository }
    }

    /// Creates a short link.
    ///
    /// A link created disabled holds no sketch backup; enabling it later starts
    /// from empty counters.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an invalid code, destination or
    /// redirect code, and [`AppError::Conflict`] if the code is taken.
    pub async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError> {
        validate_short_code(&new_link.short_code)?;
        validate_target_url(&new_link.target_url)?;
        validate_redirect_code(new_link.redirect_code)?;

        if self
            .link_repository
            .find_by_code(&new_link.short_code)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "Short code already exists",
                json!({ "shortCode": new_link.short_code }),
            ));
        }

        let link = self.link_repository.create(new_link).await?;
        info!(link_id = link.id, code = %link.short_code, "Link created");
        Ok(link)
    }

    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this id.
    pub async fn get(&self, id: i64) -> Result<ShortLink, AppError> {
        self.link_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "id": id })))
    }

    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this code.
    pub async fn get_by_code(&self, code: &str) -> Result<ShortLink, AppError> {
        self.link_repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "shortCode": code })))
    }

    /// Lists links matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `page < 1` or `size` is outside `1..=100`.
    pub async fn list(
        &self,
        filter: LinkFilter,
        page: i64,
        size: i64,
    ) -> Result<LinkPage, AppError> {
        if page < 1 {
            return Err(AppError::bad_request(
                "Page must be at least 1",
                json!({ "page": page }),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(AppError::bad_request(
                format!("Page size must be between 1 and {MAX_PAGE_SIZE}"),
                json!({ "size": size }),
            ));
        }

        let offset = (page - 1) * size;
        let items = self
            .link_repository
            .list(filter.clone(), offset, size)
            .await?;
        let total = self.link_repository.count(filter).await?;

        Ok(LinkPage {
            items,
            page,
            size,
            total,
        })
    }
}
