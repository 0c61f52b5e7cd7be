//! Pagination query parameters.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

use crate::application::services::link_service::DEFAULT_PAGE_SIZE;

/// Pagination query parameters.
///
/// Uses `serde_with` so the values still parse when flattened into a larger
/// query struct.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<i64>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub size: Option<i64>,
}

impl PaginationParams {
    /// Returns `(page, size)` with defaults applied. Range checks happen in the
    /// service.
    pub fn page_and_size(&self) -> (i64, i64) {
        (
            self.page.unwrap_or(1),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}
