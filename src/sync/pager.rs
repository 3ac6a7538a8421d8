//! Incremental list accumulation over the paged catalog.
//!
//! A `CatalogPager` holds the list a browsing session has built up so far.
//! Pages are fetched through the repository, so offline sessions page through
//! the cache exactly like online ones page through the remote source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::cache::{CacheSource, LocalStore};
use crate::catalog::CatalogItem;
use crate::error::SyncError;
use crate::remote::RemoteSource;

use super::repository::CatalogRepository;

/// Accumulated list state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
  pub items: Vec<CatalogItem>,
  /// Last page appended; 0 before the first load
  pub current_page: u32,
  pub has_next: bool,
  /// Message of the last failed page fetch, cleared by the next success
  pub pagination_error: Option<String>,
  /// Where the last appended page came from
  pub source: Option<CacheSource>,
}

/// Result of a load request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
  Appended { added: usize, total: usize },
  /// Another page fetch is outstanding; nothing was fetched
  Busy,
  /// No further pages, or the cap is reached
  Exhausted,
}

pub struct CatalogPager<R: RemoteSource, S: LocalStore> {
  repo: Arc<CatalogRepository<R, S>>,
  state: Mutex<ListState>,
  busy: AtomicBool,
  max_items: usize,
}

/// Clears the busy flag when the fetch finishes or is dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| BusyGuard(flag))
  }
}

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

impl<R: RemoteSource, S: LocalStore> CatalogPager<R, S> {
  pub fn new(repo: Arc<CatalogRepository<R, S>>, max_items: usize) -> Self {
    Self {
      repo,
      state: Mutex::new(ListState::default()),
      busy: AtomicBool::new(false),
      max_items,
    }
  }

  /// Copy of the current list state.
  pub fn snapshot(&self) -> ListState {
    self.lock().clone()
  }

  pub fn len(&self) -> usize {
    self.lock().items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_busy(&self) -> bool {
    self.busy.load(Ordering::Acquire)
  }

  /// Reset the list and load page 1.
  pub async fn load_first(&self) -> Result<LoadOutcome, SyncError> {
    let Some(_guard) = BusyGuard::acquire(&self.busy) else {
      return Ok(LoadOutcome::Busy);
    };

    *self.lock() = ListState::default();
    self.fetch_and_append(1).await
  }

  /// Load and append the page after the last one appended.
  pub async fn load_more(&self) -> Result<LoadOutcome, SyncError> {
    let Some(_guard) = BusyGuard::acquire(&self.busy) else {
      debug!("page fetch already in flight");
      return Ok(LoadOutcome::Busy);
    };

    let next_page = {
      let state = self.lock();
      if state.current_page > 0 && !state.has_next {
        return Ok(LoadOutcome::Exhausted);
      }
      state.current_page + 1
    };

    self.fetch_and_append(next_page).await
  }

  /// Retry after a failed `load_more`. Identical to it otherwise.
  pub async fn retry_load_more(&self) -> Result<LoadOutcome, SyncError> {
    if self.lock().pagination_error.is_some() {
      debug!("retrying failed page fetch");
    }
    self.load_more().await
  }

  async fn fetch_and_append(&self, page: u32) -> Result<LoadOutcome, SyncError> {
    let resolved = match self.repo.resolve_page(page).await {
      Ok(resolved) => resolved,
      Err(e) => {
        warn!(page, "failed to load page: {}", e);
        self.lock().pagination_error = Some(e.to_string());
        return Err(e);
      }
    };

    let mut state = self.lock();
    let before = state.items.len();
    state.items.extend(resolved.data.data);
    state.items.truncate(self.max_items);

    let at_cap = state.items.len() >= self.max_items;
    state.current_page = page;
    state.has_next = resolved.data.pagination.has_next_page && !at_cap;
    state.pagination_error = None;
    state.source = Some(resolved.source);

    let added = state.items.len() - before;
    debug!(page, added, total = state.items.len(), at_cap, "appended page");

    Ok(LoadOutcome::Appended {
      added,
      total: state.items.len(),
    })
  }

  fn lock(&self) -> MutexGuard<'_, ListState> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sync::test_support::{anime, repo, MockRemote};

  fn full_pages(remote: &MockRemote, pages: u32, page_size: i64) {
    for page in 1..=pages {
      let base = i64::from(page - 1) * page_size;
      let items = (1..=page_size).map(|i| anime(base + i, "x", None)).collect();
      remote.put_page(page, items, page < pages);
    }
  }

  #[tokio::test]
  async fn test_load_first_then_more() {
    let remote = MockRemote::default();
    full_pages(&remote, 3, 25);
    let pager = CatalogPager::new(repo(remote, true), 300);

    assert_eq!(
      pager.load_first().await.unwrap(),
      LoadOutcome::Appended {
        added: 25,
        total: 25
      }
    );
    assert_eq!(
      pager.load_more().await.unwrap(),
      LoadOutcome::Appended {
        added: 25,
        total: 50
      }
    );

    let state = pager.snapshot();
    assert_eq!(state.current_page, 2);
    assert!(state.has_next);
    assert_eq!(state.items[25].id, 26);
    assert_eq!(state.source, Some(CacheSource::Network));
  }

  #[tokio::test]
  async fn test_never_exceeds_cap() {
    let remote = MockRemote::default();
    full_pages(&remote, 20, 25);
    let pager = CatalogPager::new(repo(remote, true), 300);

    pager.load_first().await.unwrap();
    let mut loads = 1;
    while pager.snapshot().has_next {
      pager.load_more().await.unwrap();
      loads += 1;
      assert!(pager.len() <= 300);
    }

    assert_eq!(loads, 12);
    assert_eq!(pager.len(), 300);
    assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::Exhausted);
  }

  #[tokio::test]
  async fn test_cap_truncates_partial_page() {
    let remote = MockRemote::default();
    full_pages(&remote, 2, 25);
    let pager = CatalogPager::new(repo(remote, true), 30);

    pager.load_first().await.unwrap();
    assert_eq!(
      pager.load_more().await.unwrap(),
      LoadOutcome::Appended {
        added: 5,
        total: 30
      }
    );
    assert!(!pager.snapshot().has_next);
  }

  #[tokio::test]
  async fn test_exhausted_when_remote_has_no_next_page() {
    let remote = MockRemote::default();
    full_pages(&remote, 1, 25);
    let pager = CatalogPager::new(repo(remote, true), 300);

    pager.load_first().await.unwrap();
    let calls = pager.repo.remote.calls();
    assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::Exhausted);
    assert_eq!(pager.repo.remote.calls(), calls);
  }

  #[tokio::test]
  async fn test_busy_while_fetch_outstanding() {
    let remote = MockRemote::default();
    full_pages(&remote, 2, 25);
    let pager = CatalogPager::new(repo(remote, true), 300);

    let _held = BusyGuard::acquire(&pager.busy).unwrap();
    assert!(pager.is_busy());
    assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::Busy);
    assert_eq!(pager.load_first().await.unwrap(), LoadOutcome::Busy);
    assert_eq!(pager.repo.remote.calls(), 0);
  }

  #[tokio::test]
  async fn test_failure_keeps_list_and_retry_recovers() {
    let remote = MockRemote::default();
    full_pages(&remote, 2, 25);
    let pager = CatalogPager::new(repo(remote, true), 300);
    pager.load_first().await.unwrap();

    pager.repo.remote.set_down(true);
    assert!(pager.load_more().await.is_err());
    let state = pager.snapshot();
    assert_eq!(state.items.len(), 25);
    assert_eq!(state.current_page, 1);
    assert!(state.pagination_error.is_some());
    assert!(!pager.is_busy());

    pager.repo.remote.set_down(false);
    assert_eq!(
      pager.retry_load_more().await.unwrap(),
      LoadOutcome::Appended {
        added: 25,
        total: 50
      }
    );
    assert!(pager.snapshot().pagination_error.is_none());
  }

  #[tokio::test]
  async fn test_offline_paging_reads_cache() {
    let remote = MockRemote::default();
    full_pages(&remote, 2, 25);
    let repo = repo(remote, true);
    repo.resolve_page(1).await.unwrap();
    repo.resolve_page(2).await.unwrap();
    repo.connectivity().set_online(false);

    let pager = CatalogPager::new(repo, 300);
    pager.load_first().await.unwrap();
    pager.load_more().await.unwrap();
    // Third page is empty offline
    assert_eq!(
      pager.load_more().await.unwrap(),
      LoadOutcome::Appended {
        added: 0,
        total: 50
      }
    );
    let state = pager.snapshot();
    assert!(!state.has_next);
    assert_eq!(state.source, Some(CacheSource::Offline));
    assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::Exhausted);
  }

  #[tokio::test]
  async fn test_load_first_resets() {
    let remote = MockRemote::default();
    full_pages(&remote, 2, 25);
    let pager = CatalogPager::new(repo(remote, true), 300);

    pager.load_first().await.unwrap();
    pager.load_more().await.unwrap();
    pager.load_first().await.unwrap();
    assert_eq!(pager.len(), 25);
    assert_eq!(pager.snapshot().current_page, 1);
  }
}
