//! Local persistence for catalog records, with offline support.
//!
//! This module provides the store the sync core reads and writes:
//! - Records keyed by numeric identity, overwritten whole on every write
//! - Sync metadata (`last_updated`, offline availability) per record
//! - Ranked range scans and title search for offline browsing
//! - A change feed so standing resolutions can re-run when data moves

mod storage;
mod traits;

pub use storage::{LocalStore, SqliteStore, StoreChange, StoreError};
pub use traits::{CacheSource, CachedRecord, Cacheable, Resolved};
