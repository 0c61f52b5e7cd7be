//! Short link entity: one short code mapped to a destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short code with its destination, redirect type and reconciled counters.
///
/// The serialized form (JSON) is what the redirect cache stores; the sketch backup is
/// never serialized since it only exists while the link is unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub id: i64,
    pub short_code: String,
    pub target_url: String,
    pub redirect_code: i32,
    pub disabled: bool,
    pub total_pv: i64,
    pub total_uv: i64,
    #[serde(skip)]
    pub uv_backup: Option<Vec<u8>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShortLink {
    /// Returns true when the link is disabled and was last touched before `cutoff`.
    ///
    /// Such links have no live counters worth reconciling.
    pub fn is_stale_disabled(&self, cutoff: DateTime<Utc>) -> bool {
        self.disabled && self.updated_at < cutoff
    }

    pub fn has_uv_backup(&self) -> bool {
        self.uv_backup.as_ref().is_some_and(|b| !b.is_empty())
    }
}

/// Input data for creating a new short link.
#[derive(Debug, Clone)]
pub struct NewShortLink {
    pub short_code: String,
    pub target_url: String,
    pub redirect_code: i32,
    pub disabled: bool,
}

/// Requested changes to an existing link.
///
/// `disabled: None` leaves the flag alone and bypasses the state transition.
#[derive(Debug, Clone)]
pub struct LinkUpdate {
    pub target_url: String,
    pub redirect_code: i32,
    pub disabled: Option<bool>,
}

/// Listing filters; every `None` field matches all links.
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    pub short_code: Option<String>,
    pub target_url: Option<String>,
    pub redirect_code: Option<i32>,
    pub disabled: Option<bool>,
}
