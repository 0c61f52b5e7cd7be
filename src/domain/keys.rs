//! Key naming scheme shared by the redirect cache and the counter store.
//!
//! ```text
//! redirect:shortcode:{code}        cached record (or empty negative marker)
//! redirect:pv:{yyyyMMdd}           hash, field = code, daily page views
//! redirect:uv:{yyyyMMdd}:{code}    daily unique-visitor sketch
//! redirect:total_pv:{code}         cumulative page views
//! redirect:total_uv:{code}         cumulative unique-visitor sketch
//! ```

use chrono::{NaiveDate, Utc};

pub const KEY_PREFIX: &str = "redirect:";

/// Formats a calendar day as `yyyyMMdd`.
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

/// Current calendar day (UTC) used for daily counters and statistics rows.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn short_code_key(code: &str) -> String {
    format!("{KEY_PREFIX}shortcode:{code}")
}

pub fn daily_pv_key(day: NaiveDate) -> String {
    format!("{KEY_PREFIX}pv:{}", day_key(day))
}

pub fn daily_uv_key(code: &str, day: NaiveDate) -> String {
    format!("{KEY_PREFIX}uv:{}:{code}", day_key(day))
}

pub fn total_pv_key(code: &str) -> String {
    format!("{KEY_PREFIX}total_pv:{code}")
}

pub fn total_uv_key(code: &str) -> String {
    format!("{KEY_PREFIX}total_uv:{code}")
}

/// Cumulative counter keys removed when a link is disabled or deleted.
///
/// Daily keys are left to expire on their own.
pub fn cumulative_keys(code: &str) -> Vec<String> {
    vec![total_pv_key(code), total_uv_key(code)]
}
