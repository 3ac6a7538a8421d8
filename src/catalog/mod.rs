//! Catalog domain types: anime titles, their cast, and result pages.

mod cache;
mod types;

pub use types::{
  CastMember, CatalogItem, ImageSet, LocalizedTitle, Page, Pagination, PaginationItems, Tag,
  Trailer, VoicePerformance,
};
