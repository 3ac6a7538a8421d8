//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

/// Trait for entities that can be cached.
///
/// Implementors provide the numeric key they are stored under. The key is the
/// join key between remote payloads and local records.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Primary identity within the entity's table
  fn cache_key(&self) -> i64;

  /// Entity type name used in logs and change notifications (e.g. "anime")
  fn entity_type() -> &'static str;

  /// Serialize for storage and compute the payload digest alongside.
  ///
  /// Two writes with the same digest are the same write as far as observers
  /// are concerned.
  fn to_payload(&self) -> serde_json::Result<(Vec<u8>, String)> {
    let data = serde_json::to_vec(self)?;
    let digest = hex::encode(Sha256::digest(&data));
    Ok((data, digest))
  }
}

/// A stored entity plus its synchronization metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRecord<T> {
  pub value: T,
  /// Wall-clock time of the last successful write
  pub last_updated: DateTime<Utc>,
  pub offline_available: bool,
}

/// Result of a resolution, including data and metadata about the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> Resolved<T> {
  /// Fresh data straight from the remote source.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Cached data served because the remote attempt failed.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Cached data served because the device is offline.
  pub fn offline(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at,
    }
  }
}

/// Indicates where resolved data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Online, but the remote attempt failed and cached data was served
  Cache,
  /// Offline mode - network unavailable, serving cached data
  Offline,
}

impl CacheSource {
  pub fn label(self) -> &'static str {
    match self {
      CacheSource::Network => "network",
      CacheSource::Cache => "cache",
      CacheSource::Offline => "offline",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolved_constructors_tag_source() {
    let at = Utc::now();

    let fresh = Resolved::from_network("a");
    assert_eq!(fresh.source, CacheSource::Network);
    assert_eq!(fresh.cached_at, None);

    let fallback = Resolved::from_cache("a", at);
    assert_eq!(fallback.source, CacheSource::Cache);
    assert_eq!(fallback.cached_at, Some(at));

    let offline = Resolved::offline("a", None);
    assert_eq!(offline.source.label(), "offline");
  }
}
