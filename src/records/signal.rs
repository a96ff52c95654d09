//! Storage-change signals shared between contexts.
//!
//! A context that writes a key publishes a [`StorageChange`] on the bus.
//! Writes made by other processes are picked up by [`spawn_watcher`], which
//! polls SQLite's `data_version` and republishes them as external changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::backend::SqliteKv;

/// Identifies the context (in-process or foreign) that made a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
  /// Changes observed from another process.
  pub const EXTERNAL: ContextId = ContextId(0);

  /// Allocate a fresh id for a new context in this process.
  pub fn next() -> Self {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
  }
}

/// A durable key was changed by some context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
  pub key: String,
  pub origin: ContextId,
}

/// Broadcast channel carrying storage-change signals.
#[derive(Clone)]
pub struct StorageBus {
  tx: broadcast::Sender<StorageChange>,
}

impl StorageBus {
  pub fn new() -> Self {
    let (tx, _rx) = broadcast::channel(64);
    Self { tx }
  }

  /// Notify every subscriber. Having no subscribers is fine.
  pub fn publish(&self, change: StorageChange) {
    let _ = self.tx.send(change);
  }

  pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
    self.tx.subscribe()
  }
}

impl Default for StorageBus {
  fn default() -> Self {
    Self::new()
  }
}

/// Poll `kv` for writes by other connections and publish them under `key`.
///
/// The task runs until aborted through the returned handle.
pub fn spawn_watcher(
  kv: Arc<SqliteKv>,
  key: String,
  bus: StorageBus,
  interval: Duration,
) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut last = match kv.data_version() {
      Ok(v) => v,
      Err(e) => {
        warn!(error = %e, "Storage watcher could not read data_version");
        return;
      }
    };
    let mut ticker = tokio::time::interval(interval);

    loop {
      ticker.tick().await;
      match kv.data_version() {
        Ok(version) if version != last => {
          debug!(key = %key, "External storage change detected");
          last = version;
          bus.publish(StorageChange {
            key: key.clone(),
            origin: ContextId::EXTERNAL,
          });
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Storage watcher poll failed"),
      }
    }
  })
}
