//! Remote catalog source: the Jikan REST API and the seam the sync core uses
//! to talk to it.

pub mod api_types;
pub mod client;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::{CastMember, CatalogItem, Page};

pub use client::JikanClient;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
  /// No response at all (DNS, connect, timeout, reset)
  #[error("transport failure: {0}")]
  Transport(String),
  /// A response arrived but the body did not match the expected shape
  #[error("failed to decode response: {0}")]
  Decode(String),
  #[error("{}", crate::error::describe_status(*code, message))]
  Status { code: u16, message: String },
  /// 2xx with an empty or `null` body
  #[error("empty response body")]
  EmptyBody,
}

impl RemoteError {
  /// Whether the next endpoint in a strategy list is worth trying.
  ///
  /// A status rejection is the API's answer about the id itself and would be
  /// repeated by every endpoint.
  pub fn allows_fallback(&self) -> bool {
    matches!(self, RemoteError::Transport(_) | RemoteError::Decode(_))
  }
}

/// Request/response contract of the remote catalog.
#[async_trait]
pub trait RemoteSource: Send + Sync + 'static {
  /// One page of the ranked catalog
  async fn top_anime(&self, page: u32) -> Result<Page<CatalogItem>, RemoteError>;

  /// Summary record; `Ok(None)` when the API answered without a payload
  async fn anime(&self, id: i64) -> Result<Option<CatalogItem>, RemoteError>;

  /// Full record with relations, preferred over [`RemoteSource::anime`]
  async fn anime_full(&self, id: i64) -> Result<Option<CatalogItem>, RemoteError>;

  async fn anime_characters(&self, id: i64) -> Result<Vec<CastMember>, RemoteError>;
}
