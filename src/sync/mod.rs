//! Offline-first synchronization core.
//!
//! - [`CatalogRepository`] resolves single items, catalog pages and casts,
//!   preferring the remote source and falling back to the local store
//! - [`Subscription`] is a standing resolution that re-runs on connectivity
//!   changes and relevant store writes
//! - [`CatalogPager`] accumulates pages into a capped list
//! - the staleness sweep refreshes records older than a cutoff

mod pager;
mod repository;
mod subscription;
mod sweep;

pub use pager::{CatalogPager, ListState, LoadOutcome};
pub use repository::{CatalogRepository, DetailEndpoint, RepositorySettings};
pub use subscription::{Emission, Subscription};
pub use sweep::SweepReport;
