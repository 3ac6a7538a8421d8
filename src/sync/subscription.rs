//! Standing resolutions: combine-latest over connectivity and the store's
//! change feed, re-running a resolution step on every relevant trigger.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::cache::{Resolved, StoreChange};
use crate::error::SyncError;

/// One emission of a standing resolution
pub type Emission<T> = Result<Resolved<T>, SyncError>;

/// Live handle on a standing resolution.
///
/// Each item is the best-known value at the time of a trigger. Consecutive
/// emissions are never equal. Dropping the subscription stops it; a remote
/// call in flight at that point is abandoned.
pub struct Subscription<T> {
  rx: mpsc::UnboundedReceiver<Emission<T>>,
  task: JoinHandle<()>,
}

impl<T> Subscription<T> {
  /// Wait for the next emission. `None` once the sources are gone.
  pub async fn next(&mut self) -> Option<Emission<T>> {
    self.rx.recv().await
  }
}

impl<T> Drop for Subscription<T> {
  fn drop(&mut self) {
    self.task.abort();
  }
}

impl<T> Stream for Subscription<T> {
  type Item = Emission<T>;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.rx.poll_recv(cx)
  }
}

/// What an emission looks like for deduplication purposes.
///
/// Values compare by data only: the same data arriving via a different source
/// is not news.
enum Fingerprint<T> {
  Value(T),
  Error(String),
}

impl<T: PartialEq + Clone> Fingerprint<T> {
  fn of(emission: &Emission<T>) -> Self {
    match emission {
      Ok(resolved) => Fingerprint::Value(resolved.data.clone()),
      Err(e) => Fingerprint::Error(e.to_string()),
    }
  }

  fn matches(&self, emission: &Emission<T>) -> bool {
    match (self, emission) {
      (Fingerprint::Value(last), Ok(resolved)) => *last == resolved.data,
      (Fingerprint::Error(last), Err(e)) => *last == e.to_string(),
      _ => false,
    }
  }
}

/// Why the loop woke up
enum Trigger {
  Connectivity,
  Store,
  Closed,
}

/// Spawn a standing resolution.
///
/// `step` is run once up front and again whenever connectivity changes or the
/// store reports a change accepted by `relevant`.
pub(crate) fn spawn<T, R, F, Fut>(
  online: watch::Receiver<bool>,
  changes: broadcast::Receiver<StoreChange>,
  relevant: R,
  step: F,
) -> Subscription<T>
where
  T: PartialEq + Clone + Send + 'static,
  R: Fn(&StoreChange) -> bool + Send + Sync + 'static,
  F: Fn(bool) -> Fut + Send + 'static,
  Fut: Future<Output = Emission<T>> + Send + 'static,
{
  let (tx, rx) = mpsc::unbounded_channel();
  let task = tokio::spawn(drive(online, changes, relevant, step, tx));
  Subscription { rx, task }
}

async fn drive<T, R, F, Fut>(
  mut online: watch::Receiver<bool>,
  mut changes: broadcast::Receiver<StoreChange>,
  relevant: R,
  step: F,
  tx: mpsc::UnboundedSender<Emission<T>>,
) where
  T: PartialEq + Clone + Send + 'static,
  R: Fn(&StoreChange) -> bool + Send + Sync + 'static,
  F: Fn(bool) -> Fut + Send + 'static,
  Fut: Future<Output = Emission<T>> + Send + 'static,
{
  let mut last: Option<Fingerprint<T>> = None;

  loop {
    let is_online = *online.borrow_and_update();
    let emission = step(is_online).await;

    if last.as_ref().is_some_and(|f| f.matches(&emission)) {
      trace!("suppressing duplicate emission");
    } else {
      last = Some(Fingerprint::of(&emission));
      if tx.send(emission).is_err() {
        // Receiver dropped
        return;
      }
    }

    match next_trigger(&mut online, &mut changes, &relevant).await {
      Trigger::Connectivity => debug!("re-resolving after connectivity change"),
      Trigger::Store => debug!("re-resolving after store change"),
      Trigger::Closed => return,
    }
  }
}

async fn next_trigger<R>(
  online: &mut watch::Receiver<bool>,
  changes: &mut broadcast::Receiver<StoreChange>,
  relevant: &R,
) -> Trigger
where
  R: Fn(&StoreChange) -> bool,
{
  loop {
    tokio::select! {
      changed = online.changed() => {
        return match changed {
          Ok(()) => Trigger::Connectivity,
          Err(_) => Trigger::Closed,
        };
      }
      change = changes.recv() => match change {
        Ok(change) if relevant(&change) => return Trigger::Store,
        Ok(_) => continue,
        // Missed some changes; one of them may have been ours
        Err(broadcast::error::RecvError::Lagged(_)) => return Trigger::Store,
        Err(broadcast::error::RecvError::Closed) => return Trigger::Closed,
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  fn channels() -> (
    watch::Sender<bool>,
    broadcast::Sender<StoreChange>,
  ) {
    let (online_tx, _) = watch::channel(true);
    let (changes_tx, _) = broadcast::channel(16);
    (online_tx, changes_tx)
  }

  async fn next_within<T>(sub: &mut Subscription<T>) -> Option<Emission<T>> {
    tokio::time::timeout(Duration::from_millis(200), sub.next())
      .await
      .ok()
      .flatten()
  }

  #[tokio::test]
  async fn test_emits_initial_value() {
    let (online_tx, changes_tx) = channels();
    let mut sub = spawn(
      online_tx.subscribe(),
      changes_tx.subscribe(),
      |_| true,
      |online| async move { Ok(Resolved::from_network(online)) },
    );

    let first = next_within(&mut sub).await.unwrap().unwrap();
    assert!(first.data);
  }

  #[tokio::test]
  async fn test_connectivity_change_retriggers() {
    let (online_tx, changes_tx) = channels();
    let mut sub = spawn(
      online_tx.subscribe(),
      changes_tx.subscribe(),
      |_| true,
      |online| async move { Ok(Resolved::from_network(online)) },
    );

    assert!(next_within(&mut sub).await.unwrap().unwrap().data);
    online_tx.send(false).unwrap();
    assert!(!next_within(&mut sub).await.unwrap().unwrap().data);
  }

  #[tokio::test]
  async fn test_duplicates_are_suppressed() {
    let (online_tx, changes_tx) = channels();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let mut sub = spawn(
      online_tx.subscribe(),
      changes_tx.subscribe(),
      |_| true,
      move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(Resolved::from_network("same")) }
      },
    );

    assert_eq!(next_within(&mut sub).await.unwrap().unwrap().data, "same");
    changes_tx.send(StoreChange::Items(vec![1])).unwrap();
    changes_tx.send(StoreChange::Items(vec![1])).unwrap();

    assert!(next_within(&mut sub).await.is_none());
    assert!(runs.load(Ordering::SeqCst) >= 2);
  }

  #[tokio::test]
  async fn test_irrelevant_changes_are_ignored() {
    let (online_tx, changes_tx) = channels();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let mut sub = spawn(
      online_tx.subscribe(),
      changes_tx.subscribe(),
      |change: &StoreChange| change.touches_item(1),
      move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(Resolved::from_network(n)) }
      },
    );

    assert_eq!(next_within(&mut sub).await.unwrap().unwrap().data, 0);
    changes_tx.send(StoreChange::Items(vec![2])).unwrap();
    changes_tx.send(StoreChange::Cast(1)).unwrap();
    assert!(next_within(&mut sub).await.is_none());
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    changes_tx.send(StoreChange::Items(vec![2, 1])).unwrap();
    assert_eq!(next_within(&mut sub).await.unwrap().unwrap().data, 1);
  }

  #[tokio::test]
  async fn test_drop_stops_task() {
    let (online_tx, changes_tx) = channels();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let mut sub = spawn(
      online_tx.subscribe(),
      changes_tx.subscribe(),
      |_| true,
      move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(Resolved::from_network(n)) }
      },
    );
    next_within(&mut sub).await.unwrap().unwrap();
    drop(sub);
    tokio::task::yield_now().await;

    let _ = online_tx.send(false);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_closed_sources_end_stream() {
    let (online_tx, changes_tx) = channels();
    let mut sub = spawn(
      online_tx.subscribe(),
      changes_tx.subscribe(),
      |_| true,
      |_| async move { Ok(Resolved::from_network(1)) },
    );
    next_within(&mut sub).await.unwrap().unwrap();
    drop(online_tx);
    assert!(next_within(&mut sub).await.is_none());
  }
}
