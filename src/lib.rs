pub mod cache;
pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod logging;
pub mod remote;
pub mod sync;

pub use error::SyncError;
