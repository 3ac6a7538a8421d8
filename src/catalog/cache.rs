//! Caching implementations for catalog types.

use crate::cache::Cacheable;

use super::types::{CastMember, CatalogItem};

impl Cacheable for CatalogItem {
  fn cache_key(&self) -> i64 {
    self.id
  }

  fn entity_type() -> &'static str {
    "anime"
  }
}

impl Cacheable for CastMember {
  /// Character id; unique only together with `anime_id`
  fn cache_key(&self) -> i64 {
    self.character_id
  }

  fn entity_type() -> &'static str {
    "character"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_payload_digest_tracks_content() {
    let a = CatalogItem::new(1, "Cowboy Bebop");
    let mut b = a.clone();

    let (_, digest_a) = a.to_payload().unwrap();
    let (_, digest_b) = b.to_payload().unwrap();
    assert_eq!(digest_a, digest_b);
    assert_eq!(digest_a.len(), 64);

    b.score = Some(8.75);
    let (_, digest_b) = b.to_payload().unwrap();
    assert_ne!(digest_a, digest_b);
  }

  #[test]
  fn test_cache_keys() {
    assert_eq!(CatalogItem::new(42, "x").cache_key(), 42);
    assert_eq!(CatalogItem::entity_type(), "anime");
    assert_eq!(CastMember::entity_type(), "character");
  }
}
