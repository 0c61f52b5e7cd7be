//! Business logic services for the application layer.
//!
//! - [`RedirectService`] - Cache-aside resolution and visit dispatch
//! - [`SyncService`] - Disable, enable and delete transitions
//! - [`ReconcileService`] - Periodic counter flush into the database
//! - [`LinkService`] - Link authoring and listing
//! - [`StatsService`] - Reconciled statistics reads

pub mod link_service;
pub mod reconcile_service;
pub mod redirect_service;
pub mod stats_service;
pub mod sync_service;

pub use link_service::{LinkPage, LinkService};
pub use reconcile_service::{
    ReconcileService, ReconcileSettings, SweepReport, run_reconcile_scheduler,
};
pub use redirect_service::{RedirectService, ResolverSettings};
pub use stats_service::{LinkStats, StatsService};
pub use sync_service::SyncService;
