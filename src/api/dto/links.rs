//! DTOs for the short link management endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use validator::Validate;

use super::pagination::PaginationParams;
use crate::application::services::LinkPage;
use crate::domain::entities::{LinkFilter, LinkUpdate, NewShortLink, ShortLink};

const DEFAULT_REDIRECT_CODE: i32 = 302;

/// Request body for `POST /api/shortlink`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    #[validate(length(min = 1, max = 32))]
    pub short_code: String,

    #[validate(url(message = "Invalid URL format"))]
    #[validate(length(max = 2048))]
    pub target_url: String,

    /// 301 or 302; defaults to 302.
    pub redirect_code: Option<i32>,

    #[serde(default)]
    pub disabled: bool,
}

impl From<CreateLinkRequest> for NewShortLink {
    fn from(req: CreateLinkRequest) -> Self {
        Self {
            short_code: req.short_code,
            target_url: req.target_url,
            redirect_code: req.redirect_code.unwrap_or(DEFAULT_REDIRECT_CODE),
            disabled: req.disabled,
        }
    }
}

/// Request body for `PUT /api/shortlink/{id}`.
///
/// Omitting `disabled` leaves the flag unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinkRequest {
    #[validate(url(message = "Invalid URL format"))]
    #[validate(length(max = 2048))]
    pub target_url: String,

    pub redirect_code: i32,

    pub disabled: Option<bool>,
}

impl From<UpdateLinkRequest> for LinkUpdate {
    fn from(req: UpdateLinkRequest) -> Self {
        Self {
            target_url: req.target_url,
            redirect_code: req.redirect_code,
            disabled: req.disabled,
        }
    }
}

/// Request body for `PUT /api/shortlink/status/{id}`.
#[derive(Debug, Deserialize)]
pub struct LinkStatusRequest {
    pub disabled: bool,
}

/// Query string for `GET /api/shortlink`.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLinksQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,

    /// Substring of the short code.
    pub short_code: Option<String>,

    /// Substring of the destination.
    pub target_url: Option<String>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub redirect_code: Option<i32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub disabled: Option<bool>,
}

impl ListLinksQuery {
    pub fn filter(&self) -> LinkFilter {
        LinkFilter {
            short_code: self.short_code.clone().filter(|s| !s.is_empty()),
            target_url: self.target_url.clone().filter(|s| !s.is_empty()),
            redirect_code: self.redirect_code,
            disabled: self.disabled,
        }
    }
}

/// JSON representation of a short link.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub id: i64,
    pub short_code: String,
    pub target_url: String,
    pub redirect_code: i32,
    pub disabled: bool,
    pub total_pv: i64,
    pub total_uv: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ShortLink> for LinkResponse {
    fn from(link: ShortLink) -> Self {
        Self {
            id: link.id,
            short_code: link.short_code,
            target_url: link.target_url,
            redirect_code: link.redirect_code,
            disabled: link.disabled,
            total_pv: link.total_pv,
            total_uv: link.total_uv,
            version: link.version,
            created_at: link.created_at,
            updated_at: link.updated_at,
        }
    }
}

/// One page of links.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkListResponse {
    pub page: i64,
    pub size: i64,
    pub total: i64,
    pub total_pages: i64,
    pub list: Vec<LinkResponse>,
}

impl From<LinkPage> for LinkListResponse {
    fn from(page: LinkPage) -> Self {
        Self {
            total_pages: page.total_pages(),
            page: page.page,
            size: page.size,
            total: page.total,
            list: page.items.into_iter().map(LinkResponse::from).collect(),
        }
    }
}
