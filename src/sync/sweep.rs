//! Background staleness sweep: re-fetch cached records older than a cutoff.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cache::LocalStore;
use crate::remote::RemoteSource;

use super::repository::CatalogRepository;

/// Outcome of one sweep. Nothing in here is an error to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  /// Records (or cast owners) found older than the cutoff
  pub scanned: usize,
  pub refreshed: usize,
  /// Remote answered without a payload
  pub missing: usize,
  pub failed: usize,
  /// Nothing was attempted because the remote source was unreachable
  pub skipped_offline: bool,
}

impl SweepReport {
  fn offline() -> Self {
    Self {
      skipped_offline: true,
      ..Self::default()
    }
  }

  fn record(&mut self, outcome: Outcome) {
    match outcome {
      Outcome::Refreshed => self.refreshed += 1,
      Outcome::Missing => self.missing += 1,
      Outcome::Failed => self.failed += 1,
    }
  }
}

enum Outcome {
  Refreshed,
  Missing,
  Failed,
}

fn cutoff_for(max_age: Duration) -> DateTime<Utc> {
  let age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
  Utc::now()
    .checked_sub_signed(age)
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl<R: RemoteSource, S: LocalStore> CatalogRepository<R, S> {
  /// Refresh every catalog record last written more than `max_age` ago.
  pub async fn sync_stale(&self, max_age: Duration) -> SweepReport {
    self.sync_stale_before(cutoff_for(max_age)).await
  }

  /// Refresh every catalog record last written strictly before `cutoff`.
  ///
  /// Records are re-fetched via the summary endpoint with bounded
  /// concurrency and in no particular order. Per-record failures are logged
  /// and counted, never returned.
  pub async fn sync_stale_before(&self, cutoff: DateTime<Utc>) -> SweepReport {
    if !self.connectivity.is_online() {
      debug!("skipping staleness sweep while offline");
      return SweepReport::offline();
    }

    let stale = match self.store.stale_items(cutoff) {
      Ok(records) => records,
      Err(e) => {
        warn!("failed to scan for stale records: {}", e);
        return SweepReport::default();
      }
    };

    let mut report = SweepReport {
      scanned: stale.len(),
      ..SweepReport::default()
    };
    if stale.is_empty() {
      return report;
    }

    let ids: Vec<i64> = stale.iter().map(|r| r.value.id).collect();
    let outcomes: Vec<Outcome> = stream::iter(ids)
      .map(|id| self.refresh_item(id))
      .buffer_unordered(self.settings.sweep_concurrency.max(1))
      .collect()
      .await;

    for outcome in outcomes {
      report.record(outcome);
    }

    info!(
      scanned = report.scanned,
      refreshed = report.refreshed,
      missing = report.missing,
      failed = report.failed,
      "staleness sweep finished"
    );
    report
  }

  async fn refresh_item(&self, id: i64) -> Outcome {
    match self.remote.anime(id).await {
      Ok(Some(item)) => match self.store.upsert_item(&item, Utc::now()) {
        Ok(_) => Outcome::Refreshed,
        Err(e) => {
          warn!(id, "failed to store refreshed record: {}", e);
          Outcome::Failed
        }
      },
      Ok(None) => {
        debug!(id, "remote has no payload for stale record");
        Outcome::Missing
      }
      Err(e) => {
        warn!(id, "failed to refresh stale record: {}", e);
        Outcome::Failed
      }
    }
  }

  /// Refresh the cast of every anime with a cast record older than `max_age`.
  pub async fn sync_stale_cast(&self, max_age: Duration) -> SweepReport {
    if !self.connectivity.is_online() {
      return SweepReport::offline();
    }

    let owners = match self.store.stale_cast_owners(cutoff_for(max_age)) {
      Ok(owners) => owners,
      Err(e) => {
        warn!("failed to scan for stale cast: {}", e);
        return SweepReport::default();
      }
    };

    let mut report = SweepReport {
      scanned: owners.len(),
      ..SweepReport::default()
    };

    let outcomes: Vec<bool> = stream::iter(owners)
      .map(|anime_id| self.refresh_cast(anime_id))
      .buffer_unordered(self.settings.sweep_concurrency.max(1))
      .collect()
      .await;

    for refreshed in outcomes {
      report.record(if refreshed {
        Outcome::Refreshed
      } else {
        Outcome::Failed
      });
    }

    if report.scanned > 0 {
      info!(
        scanned = report.scanned,
        refreshed = report.refreshed,
        failed = report.failed,
        "cast sweep finished"
      );
    }
    report
  }
}
