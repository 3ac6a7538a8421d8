//! Serde-deserializable types matching Jikan v4 responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on what the cache stores.

use serde::Deserialize;

use crate::catalog::{
  CastMember, CatalogItem, ImageSet, LocalizedTitle, Page, Pagination, PaginationItems, Tag,
  Trailer, VoicePerformance,
};

// ============================================================================
// Common nested field types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ApiImageUrls {
  pub image_url: Option<String>,
  pub small_image_url: Option<String>,
  pub large_image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiImages {
  pub jpg: Option<ApiImageUrls>,
  pub webp: Option<ApiImageUrls>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTrailerImages {
  pub image_url: Option<String>,
  pub medium_image_url: Option<String>,
  pub large_image_url: Option<String>,
  pub maximum_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTrailer {
  pub youtube_id: Option<String>,
  pub url: Option<String>,
  pub embed_url: Option<String>,
  pub images: Option<ApiTrailerImages>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTitle {
  #[serde(rename = "type")]
  pub kind: String,
  pub title: String,
}

/// Genre, studio, producer, ... all share this shape
#[derive(Debug, Deserialize)]
pub struct ApiResource {
  pub mal_id: i64,
  #[serde(rename = "type", default)]
  pub kind: String,
  pub name: String,
  #[serde(default)]
  pub url: String,
}

// ============================================================================
// Anime - used by top, detail and full endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiAnime {
  pub mal_id: i64,
  pub title: String,
  pub title_english: Option<String>,
  pub title_japanese: Option<String>,
  #[serde(default)]
  pub titles: Vec<ApiTitle>,
  #[serde(rename = "type")]
  pub kind: Option<String>,
  pub source: Option<String>,
  pub episodes: Option<u32>,
  pub status: Option<String>,
  #[serde(default)]
  pub airing: bool,
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
  pub images: Option<ApiImages>,
  pub trailer: Option<ApiTrailer>,
  // Lists come back as null on some records
  pub genres: Option<Vec<ApiResource>>,
  pub studios: Option<Vec<ApiResource>>,
  pub producers: Option<Vec<ApiResource>>,
}

/// `{ "data": ... }` envelope of the single-record endpoints
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
  pub data: Option<T>,
}

// ============================================================================
// Top anime endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiPaginationItems {
  #[serde(default)]
  pub count: u32,
  #[serde(default)]
  pub total: u32,
  #[serde(default)]
  pub per_page: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApiPagination {
  #[serde(default)]
  pub last_visible_page: u32,
  #[serde(default)]
  pub has_next_page: bool,
  #[serde(default)]
  pub current_page: u32,
  pub items: Option<ApiPaginationItems>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTopAnimeResponse {
  #[serde(default)]
  pub data: Vec<ApiAnime>,
  pub pagination: ApiPagination,
}

// ============================================================================
// Characters endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiCharacter {
  pub mal_id: i64,
  #[serde(default)]
  pub url: String,
  pub images: Option<ApiImages>,
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiPerson {
  pub mal_id: i64,
  #[serde(default)]
  pub url: String,
  pub images: Option<ApiImages>,
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiVoiceActor {
  pub person: ApiPerson,
  #[serde(default)]
  pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiCharacterEntry {
  pub character: ApiCharacter,
  #[serde(default)]
  pub role: String,
  #[serde(default)]
  pub voice_actors: Vec<ApiVoiceActor>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCharactersResponse {
  #[serde(default)]
  pub data: Vec<ApiCharacterEntry>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiImages> for ImageSet {
  /// jpg variants first, webp for whatever jpg lacks
  fn from(images: ApiImages) -> Self {
    let jpg = images.jpg.unwrap_or_default();
    let webp = images.webp.unwrap_or_default();
    ImageSet {
      image: jpg.image_url.or(webp.image_url),
      small: jpg.small_image_url.or(webp.small_image_url),
      large: jpg.large_image_url.or(webp.large_image_url),
    }
  }
}

impl From<ApiResource> for Tag {
  fn from(r: ApiResource) -> Self {
    Tag {
      id: r.mal_id,
      category: r.kind,
      name: r.name,
      url: r.url,
    }
  }
}

impl ApiTrailer {
  /// None when the API sent a trailer object with nothing in it
  fn into_trailer(self) -> Option<Trailer> {
    let thumbnail = self.images.and_then(|i| {
      i.maximum_image_url
        .or(i.large_image_url)
        .or(i.medium_image_url)
        .or(i.image_url)
    });
    if self.youtube_id.is_none() && self.url.is_none() && self.embed_url.is_none() {
      return None;
    }
    Some(Trailer {
      youtube_id: self.youtube_id,
      url: self.url,
      embed_url: self.embed_url,
      thumbnail,
    })
  }
}

fn tags(list: Option<Vec<ApiResource>>) -> Vec<Tag> {
  list
    .unwrap_or_default()
    .into_iter()
    .map(Tag::from)
    .collect()
}

impl From<ApiAnime> for CatalogItem {
  fn from(a: ApiAnime) -> Self {
    CatalogItem {
      id: a.mal_id,
      title: a.title,
      title_english: a.title_english,
      title_japanese: a.title_japanese,
      titles: a
        .titles
        .into_iter()
        .map(|t| LocalizedTitle {
          kind: t.kind,
          title: t.title,
        })
        .collect(),
      kind: a.kind,
      source: a.source,
      status: a.status,
      airing: a.airing,
      episodes: a.episodes,
      duration: a.duration,
      rating: a.rating,
      score: a.score,
      scored_by: a.scored_by,
      rank: a.rank,
      popularity: a.popularity,
      members: a.members,
      favorites: a.favorites,
      synopsis: a.synopsis,
      background: a.background,
      season: a.season,
      year: a.year,
      images: a.images.map(ImageSet::from).unwrap_or_default(),
      trailer: a.trailer.and_then(ApiTrailer::into_trailer),
      genres: tags(a.genres),
      studios: tags(a.studios),
      producers: tags(a.producers),
    }
  }
}

impl From<ApiTopAnimeResponse> for Page<CatalogItem> {
  fn from(r: ApiTopAnimeResponse) -> Self {
    let count = u32::try_from(r.data.len()).unwrap_or(u32::MAX);
    let items = r.pagination.items.map_or(
      PaginationItems {
        count,
        total: count,
        per_page: count,
      },
      |i| PaginationItems {
        count: i.count,
        total: i.total,
        per_page: i.per_page,
      },
    );
    Page {
      data: r.data.into_iter().map(CatalogItem::from).collect(),
      pagination: Pagination {
        last_visible_page: r.pagination.last_visible_page,
        has_next_page: r.pagination.has_next_page,
        current_page: r.pagination.current_page,
        items,
      },
    }
  }
}

impl ApiCharacterEntry {
  pub fn into_cast_member(self, anime_id: i64) -> CastMember {
    CastMember {
      anime_id,
      character_id: self.character.mal_id,
      name: self.character.name,
      url: self.character.url,
      images: self
        .character
        .images
        .map(ImageSet::from)
        .unwrap_or_default(),
      role: self.role,
      voice_actors: self
        .voice_actors
        .into_iter()
        .map(|va| VoicePerformance {
          person_id: va.person.mal_id,
          name: va.person.name,
          url: va.person.url,
          image: va
            .person
            .images
            .map(ImageSet::from)
            .and_then(|i| i.image),
          language: va.language,
        })
        .collect(),
    }
  }
}
