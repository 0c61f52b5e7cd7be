//! Core domain entities.
//!
//! - [`ShortLink`] - A short code and its destination, plus reconciled counters
//! - [`DailyStat`] - Per-day page views and unique visitors of one link
//!
//! Creation and update inputs live next to their entity (`NewShortLink`,
//! `LinkUpdate`), as do query filters and counter snapshots.

pub mod daily_stat;
pub mod short_link;

pub use daily_stat::{DailyStat, StatsSnapshot};
pub use short_link::{LinkFilter, LinkUpdate, NewShortLink, ShortLink};
