use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::catalog::{CastMember, CatalogItem, Page};
use crate::config::{ApiConfig, CatalogConfig};
use crate::remote::api_types::{
  ApiAnime, ApiCharactersResponse, ApiEnvelope, ApiTopAnimeResponse,
};
use crate::remote::{RemoteError, RemoteSource};

/// Jikan v4 API client
#[derive(Clone)]
pub struct JikanClient {
  http: reqwest::Client,
  base: Url,
  page_size: usize,
  kind: String,
  filter: String,
}

impl JikanClient {
  pub fn new(api: &ApiConfig, catalog: &CatalogConfig) -> Result<Self, RemoteError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(api.timeout_secs))
      .user_agent(api.user_agent.clone())
      .build()
      .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self {
      http,
      base: base_url(&api.base_url)?,
      page_size: catalog.page_size,
      kind: catalog.kind.clone(),
      filter: catalog.filter.clone(),
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
    self
      .base
      .join(path)
      .map_err(|e| RemoteError::Transport(format!("invalid endpoint {}: {}", path, e)))
  }

  /// URL of a top-anime page, with the catalog query parameters applied
  pub fn top_anime_url(&self, page: u32) -> Result<Url, RemoteError> {
    let mut url = self.endpoint("top/anime")?;
    url
      .query_pairs_mut()
      .append_pair("page", &page.to_string())
      .append_pair("limit", &self.page_size.to_string())
      .append_pair("type", &self.kind)
      .append_pair("filter", &self.filter);
    Ok(url)
  }

  /// GET a JSON document, classifying every way it can go wrong.
  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
    debug!(%url, "GET");

    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| RemoteError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(RemoteError::Status {
        code: status.as_u16(),
        message: status.canonical_reason().unwrap_or_default().to_string(),
      });
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| RemoteError::Transport(e.to_string()))?;

    decode_body(&body)
  }

  /// Whether the API host answers at all. Any HTTP status counts.
  pub async fn reachable(&self) -> bool {
    match self.http.head(self.base.clone()).send().await {
      Ok(_) => true,
      Err(e) => {
        debug!("reachability probe failed: {}", e);
        false
      }
    }
  }
}

#[async_trait]
impl RemoteSource for JikanClient {
  async fn top_anime(&self, page: u32) -> Result<Page<CatalogItem>, RemoteError> {
    let url = self.top_anime_url(page)?;
    let response: ApiTopAnimeResponse = self.get_json(url).await?;
    Ok(response.into())
  }

  async fn anime(&self, id: i64) -> Result<Option<CatalogItem>, RemoteError> {
    let url = self.endpoint(&format!("anime/{}", id))?;
    let envelope: ApiEnvelope<ApiAnime> = self.get_json(url).await?;
    Ok(envelope.data.map(CatalogItem::from))
  }

  async fn anime_full(&self, id: i64) -> Result<Option<CatalogItem>, RemoteError> {
    let url = self.endpoint(&format!("anime/{}/full", id))?;
    let envelope: ApiEnvelope<ApiAnime> = self.get_json(url).await?;
    Ok(envelope.data.map(CatalogItem::from))
  }

  async fn anime_characters(&self, id: i64) -> Result<Vec<CastMember>, RemoteError> {
    let url = self.endpoint(&format!("anime/{}/characters", id))?;
    let response: ApiCharactersResponse = self.get_json(url).await?;
    Ok(
      response
        .data
        .into_iter()
        .map(|entry| entry.into_cast_member(id))
        .collect(),
    )
  }
}

/// Parse the configured base URL; `join` needs the trailing slash.
fn base_url(raw: &str) -> Result<Url, RemoteError> {
  let mut raw = raw.trim().to_string();
  if !raw.ends_with('/') {
    raw.push('/');
  }
  Url::parse(&raw).map_err(|e| RemoteError::Transport(format!("invalid base URL {}: {}", raw, e)))
}

/// Decode a 2xx body. Empty and `null` bodies are their own failure.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, RemoteError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Err(RemoteError::EmptyBody);
  }
  let parsed: Option<T> =
    serde_json::from_slice(body).map_err(|e| RemoteError::Decode(e.to_string()))?;
  parsed.ok_or(RemoteError::EmptyBody)
}
