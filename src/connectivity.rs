//! Observable online/offline state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Connectivity monitor shared by every component that needs to know whether
/// the remote source is worth trying.
///
/// Cloning is cheap; all clones observe and drive the same state.
#[derive(Clone, Debug)]
pub struct Connectivity {
  tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
  pub fn new(online: bool) -> Self {
    let (tx, _rx) = watch::channel(online);
    Self { tx: Arc::new(tx) }
  }

  pub fn is_online(&self) -> bool {
    *self.tx.borrow()
  }

  /// Record a new observation. Observers only wake on actual transitions.
  pub fn set_online(&self, online: bool) {
    let changed = self.tx.send_if_modified(|current| {
      if *current == online {
        return false;
      }
      *current = online;
      true
    });

    if changed {
      info!(online, "connectivity changed");
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.tx.subscribe()
  }

  /// Periodically run `probe` and record its verdict until the returned
  /// handle is aborted.
  pub fn spawn_probe<F, Fut>(&self, interval: Duration, probe: F) -> JoinHandle<()>
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send,
  {
    let monitor = self.clone();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        monitor.set_online(probe().await);
      }
    })
  }
}

impl Default for Connectivity {
  fn default() -> Self {
    Self::new(true)
  }
}
