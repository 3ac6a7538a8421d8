use serde::{Deserialize, Serialize};

/// One anime title in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
  pub id: i64,
  pub title: String,
  pub title_english: Option<String>,
  pub title_japanese: Option<String>,
  /// Localized and alternative titles ("Default", "Synonym", "French", ...)
  #[serde(default)]
  pub titles: Vec<LocalizedTitle>,
  pub kind: Option<String>, // "TV", "Movie", "OVA", ...
  pub source: Option<String>,
  pub status: Option<String>,
  pub airing: bool,
  pub episodes: Option<u32>,
  pub duration: Option<String>,
  pub rating: Option<String>,
  pub score: Option<f64>,
  pub scored_by: Option<u64>,
  pub rank: Option<u32>,
  pub popularity: Option<u32>,
  pub members: Option<u64>,
  pub favorites: Option<u64>,
  pub synopsis: Option<String>,
  pub background: Option<String>,
  pub season: Option<String>,
  pub year: Option<i32>,
  #[serde(default)]
  pub images: ImageSet,
  pub trailer: Option<Trailer>,
  #[serde(default)]
  pub genres: Vec<Tag>,
  #[serde(default)]
  pub studios: Vec<Tag>,
  #[serde(default)]
  pub producers: Vec<Tag>,
}

impl CatalogItem {
  /// Minimal item with only identity and primary title set
  pub fn new(id: i64, title: impl Into<String>) -> Self {
    Self {
      id,
      title: title.into(),
      title_english: None,
      title_japanese: None,
      titles: Vec::new(),
      kind: None,
      source: None,
      status: None,
      airing: false,
      episodes: None,
      duration: None,
      rating: None,
      score: None,
      scored_by: None,
      rank: None,
      popularity: None,
      members: None,
      favorites: None,
      synopsis: None,
      background: None,
      season: None,
      year: None,
      images: ImageSet::default(),
      trailer: None,
      genres: Vec::new(),
      studios: Vec::new(),
      producers: Vec::new(),
    }
  }

  /// English title when known, primary title otherwise
  pub fn display_title(&self) -> &str {
    self
      .title_english
      .as_deref()
      .filter(|t| !t.trim().is_empty())
      .unwrap_or(&self.title)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedTitle {
  pub kind: String,
  pub title: String,
}

/// Image URL variants for a poster or portrait
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSet {
  pub image: Option<String>,
  pub small: Option<String>,
  pub large: Option<String>,
}

impl ImageSet {
  pub fn is_empty(&self) -> bool {
    self.image.is_none() && self.small.is_none() && self.large.is_none()
  }

  /// Largest variant available
  pub fn best(&self) -> Option<&str> {
    self
      .large
      .as_deref()
      .or(self.image.as_deref())
      .or(self.small.as_deref())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
  pub youtube_id: Option<String>,
  pub url: Option<String>,
  pub embed_url: Option<String>,
  pub thumbnail: Option<String>,
}

/// Genre, studio or producer reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub id: i64,
  pub category: String,
  pub name: String,
  pub url: String,
}

/// One character's appearance within one anime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
  pub anime_id: i64,
  pub character_id: i64,
  pub name: String,
  pub url: String,
  #[serde(default)]
  pub images: ImageSet,
  pub role: String, // "Main" or "Supporting"
  #[serde(default)]
  pub voice_actors: Vec<VoicePerformance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicePerformance {
  pub person_id: i64,
  pub name: String,
  pub url: String,
  pub image: Option<String>,
  pub language: String,
}

/// A single page of results plus its pagination descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub data: Vec<T>,
  pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
  pub last_visible_page: u32,
  pub has_next_page: bool,
  pub current_page: u32,
  pub items: PaginationItems,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationItems {
  pub count: u32,
  pub total: u32,
  pub per_page: u32,
}

impl Pagination {
  /// Descriptor for a page assembled from the local cache.
  ///
  /// True totals are unknown offline, so a full page is taken to mean there
  /// may be another one after it.
  pub fn synthesized(page: u32, returned: usize, page_size: usize) -> Self {
    let count = u32::try_from(returned).unwrap_or(u32::MAX);
    Self {
      last_visible_page: page,
      has_next_page: returned > 0 && returned == page_size,
      current_page: page,
      items: PaginationItems {
        count,
        total: count,
        per_page: u32::try_from(page_size).unwrap_or(u32::MAX),
      },
    }
  }
}
