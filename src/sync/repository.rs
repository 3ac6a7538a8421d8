//! Catalog repository: the offline-first read path over a remote source and
//! a local store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{CacheSource, CachedRecord, LocalStore, Resolved};
use crate::catalog::{CastMember, CatalogItem, Page, Pagination};
use crate::connectivity::Connectivity;
use crate::error::{validate_id, SyncError};
use crate::remote::{RemoteError, RemoteSource};

use super::subscription::{self, Emission, Subscription};

/// Detail endpoints, tried in order until one answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailEndpoint {
  /// `anime/{id}/full`, richer payload
  Full,
  /// `anime/{id}`
  Summary,
}

const DETAIL_STRATEGY: [DetailEndpoint; 2] = [DetailEndpoint::Full, DetailEndpoint::Summary];

/// Tuning knobs for the repository.
#[derive(Debug, Clone)]
pub struct RepositorySettings {
  pub page_size: usize,
  /// Remote calls in flight during a staleness sweep
  pub sweep_concurrency: usize,
}

impl Default for RepositorySettings {
  fn default() -> Self {
    Self {
      page_size: 25,
      sweep_concurrency: 2,
    }
  }
}

/// Offline-first catalog repository.
///
/// Reads go remote-first when online, write through to the store on success,
/// and fall back to the store on any remote failure or when offline. The
/// repository keeps no state of its own beyond what its collaborators hold.
pub struct CatalogRepository<R: RemoteSource, S: LocalStore> {
  pub(super) remote: Arc<R>,
  pub(super) store: Arc<S>,
  pub(super) connectivity: Connectivity,
  pub(super) settings: RepositorySettings,
}

impl<R: RemoteSource, S: LocalStore> CatalogRepository<R, S> {
  pub fn new(
    remote: Arc<R>,
    store: Arc<S>,
    connectivity: Connectivity,
    settings: RepositorySettings,
  ) -> Self {
    Self {
      remote,
      store,
      connectivity,
      settings,
    }
  }

  pub fn connectivity(&self) -> &Connectivity {
    &self.connectivity
  }

  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  pub fn page_size(&self) -> usize {
    self.settings.page_size
  }

  // ==========================================================================
  // Single item
  // ==========================================================================

  /// Standing resolution of one anime.
  ///
  /// Re-resolves on every connectivity change and every store write touching
  /// `id`. Fails up front for non-positive ids.
  pub fn resolve(self: &Arc<Self>, id: i64) -> Result<Subscription<CatalogItem>, SyncError> {
    let id = validate_id(id)?;
    let repo = Arc::clone(self);

    Ok(subscription::spawn(
      self.connectivity.subscribe(),
      self.store.subscribe(),
      move |change| change.touches_item(id),
      move |online| {
        let repo = Arc::clone(&repo);
        async move { repo.resolve_item_step(id, online).await }
      },
    ))
  }

  /// One resolution of one anime with the current connectivity.
  pub async fn resolve_once(&self, id: i64) -> Emission<CatalogItem> {
    let id = validate_id(id)?;
    self
      .resolve_item_step(id, self.connectivity.is_online())
      .await
  }

  async fn resolve_item_step(&self, id: i64, online: bool) -> Emission<CatalogItem> {
    let cached = self.store.get_item(id)?;

    if !online {
      return cached
        .map(|r| Resolved::offline(r.value, Some(r.last_updated)))
        .ok_or(SyncError::NotFoundOffline(id));
    }

    match self.fetch_detail(id).await {
      Ok(Some(item)) => {
        self.store.upsert_item(&item, Utc::now())?;
        Ok(Resolved::from_network(item))
      }
      Ok(None) => {
        debug!(id, "remote answered without a payload");
        fallback(cached, id, None)
      }
      Err(e) => {
        warn!(id, "remote fetch failed: {}", e);
        fallback(cached, id, Some(e))
      }
    }
  }

  /// Walk the detail strategy list, stopping at the first endpoint that
  /// answers. Only transport and decoding failures move on to the next one.
  async fn fetch_detail(&self, id: i64) -> Result<Option<CatalogItem>, RemoteError> {
    let mut failure = None;

    for endpoint in DETAIL_STRATEGY {
      let result = match endpoint {
        DetailEndpoint::Full => self.remote.anime_full(id).await,
        DetailEndpoint::Summary => self.remote.anime(id).await,
      };

      match result {
        Err(e) if e.allows_fallback() => {
          debug!(id, ?endpoint, "detail endpoint failed, trying next: {}", e);
          failure = Some(e);
        }
        other => return other,
      }
    }

    Err(failure.unwrap_or_else(|| RemoteError::Transport("no detail endpoint".to_string())))
  }

  // ==========================================================================
  // Paged catalog
  // ==========================================================================

  /// One page of the ranked catalog.
  ///
  /// Online pages come from the remote source and are written through; a
  /// remote failure is returned as is. Offline pages are cut from the store.
  pub async fn resolve_page(&self, page: u32) -> Result<Resolved<Page<CatalogItem>>, SyncError> {
    if !self.connectivity.is_online() {
      return self.cached_page(page);
    }

    let fetched = self.remote.top_anime(page).await.map_err(|e| {
      warn!(page, "failed to fetch catalog page: {}", e);
      SyncError::from(e)
    })?;

    let changed = self.store.upsert_items(&fetched.data, Utc::now())?;
    info!(
      page,
      items = fetched.data.len(),
      changed,
      "fetched catalog page"
    );

    Ok(Resolved::from_network(fetched))
  }

  /// Page assembled from the store's ranked scan.
  pub fn cached_page(&self, page: u32) -> Result<Resolved<Page<CatalogItem>>, SyncError> {
    let page_size = self.settings.page_size;
    let offset = (page.saturating_sub(1) as usize).saturating_mul(page_size);
    let records = self.store.page_items(page_size, offset)?;
    let oldest = records.iter().map(|r| r.last_updated).min();

    debug!(page, offset, returned = records.len(), "serving catalog page from cache");

    let pagination = Pagination::synthesized(page, records.len(), page_size);
    let data = records.into_iter().map(|r| r.value).collect();
    Ok(Resolved::offline(Page { data, pagination }, oldest))
  }

  /// Re-fetch the first catalog page. Best-effort, online only.
  pub async fn refresh_catalog(&self) -> bool {
    if !self.connectivity.is_online() {
      return false;
    }

    match self.remote.top_anime(1).await {
      Ok(page) => match self.store.upsert_items(&page.data, Utc::now()) {
        Ok(changed) => {
          info!(items = page.data.len(), changed, "refreshed catalog");
          true
        }
        Err(e) => {
          warn!("failed to store refreshed catalog: {}", e);
          false
        }
      },
      Err(e) => {
        warn!("failed to refresh catalog: {}", e);
        false
      }
    }
  }

  // ==========================================================================
  // Cast
  // ==========================================================================

  /// Standing resolution of one anime's cast.
  ///
  /// A failed or offline fetch serves whatever is cached, possibly nothing.
  pub fn resolve_cast(
    self: &Arc<Self>,
    anime_id: i64,
  ) -> Result<Subscription<Vec<CastMember>>, SyncError> {
    let anime_id = validate_id(anime_id)?;
    let repo = Arc::clone(self);

    Ok(subscription::spawn(
      self.connectivity.subscribe(),
      self.store.subscribe(),
      move |change| change.touches_cast(anime_id),
      move |online| {
        let repo = Arc::clone(&repo);
        async move { repo.resolve_cast_step(anime_id, online).await }
      },
    ))
  }

  /// One resolution of one anime's cast with the current connectivity.
  pub async fn resolve_cast_once(&self, anime_id: i64) -> Emission<Vec<CastMember>> {
    let anime_id = validate_id(anime_id)?;
    self
      .resolve_cast_step(anime_id, self.connectivity.is_online())
      .await
  }

  async fn resolve_cast_step(&self, anime_id: i64, online: bool) -> Emission<Vec<CastMember>> {
    if online {
      match self.remote.anime_characters(anime_id).await {
        Ok(cast) => {
          self.store.upsert_cast(&cast, Utc::now())?;
          debug!(anime_id, count = cast.len(), "fetched cast");
          return Ok(Resolved::from_network(cast));
        }
        Err(e) => warn!(anime_id, "failed to fetch cast: {}", e),
      }
    }

    let records = self.store.cast_for(anime_id)?;
    let oldest = records.iter().map(|r| r.last_updated).min();
    let cast = records.into_iter().map(|r| r.value).collect();

    Ok(if online {
      Resolved {
        data: cast,
        source: CacheSource::Cache,
        cached_at: oldest,
      }
    } else {
      Resolved::offline(cast, oldest)
    })
  }

  /// Re-fetch one anime's cast. Best-effort, online only.
  pub async fn refresh_cast(&self, anime_id: i64) -> bool {
    if anime_id <= 0 || !self.connectivity.is_online() {
      return false;
    }

    match self.remote.anime_characters(anime_id).await {
      Ok(cast) => match self.store.upsert_cast(&cast, Utc::now()) {
        Ok(_) => true,
        Err(e) => {
          warn!(anime_id, "failed to store refreshed cast: {}", e);
          false
        }
      },
      Err(e) => {
        warn!(anime_id, "failed to refresh cast: {}", e);
        false
      }
    }
  }

  // ==========================================================================
  // Local-only operations
  // ==========================================================================

  /// Title search over cached records only. Never touches the network.
  pub fn search(&self, query: &str) -> Result<Vec<CatalogItem>, SyncError> {
    let records = self.store.search_items(query)?;
    Ok(records.into_iter().map(|r| r.value).collect())
  }

  /// Drop every cached record.
  pub fn clear(&self) -> Result<(), SyncError> {
    self.store.clear()?;
    info!("cleared local cache");
    Ok(())
  }
}

/// Serve the cached record after a failed or empty remote attempt.
fn fallback(
  cached: Option<CachedRecord<CatalogItem>>,
  id: i64,
  cause: Option<RemoteError>,
) -> Emission<CatalogItem> {
  match cached {
    Some(record) => Ok(Resolved::from_cache(record.value, record.last_updated)),
    None => Err(SyncError::NotFound { id, cause }),
  }
}
