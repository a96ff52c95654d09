//! In-memory view of the saved quotes, kept in step with durable storage.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use super::signal::StorageChange;
use super::store::RecordStore;
use super::types::{Language, SavedRecord};

/// Read model over a [`RecordStore`].
///
/// Every mutation goes through the store and is followed by a full reload,
/// never a local patch. Changes made by other contexts arrive as storage
/// signals and trigger the same reload.
pub struct SavedQuotes {
  store: RecordStore,
  quotes: Vec<SavedRecord>,
  favorites: Vec<SavedRecord>,
  changes: Option<broadcast::Receiver<StorageChange>>,
}

impl SavedQuotes {
  /// Activate the view: subscribe to the store's bus and load.
  pub fn new(store: RecordStore) -> Self {
    let changes = store.bus().map(|bus| bus.subscribe());
    let mut view = Self {
      store,
      quotes: Vec::new(),
      favorites: Vec::new(),
      changes,
    };
    view.reload();
    view
  }

  pub fn quotes(&self) -> &[SavedRecord] {
    &self.quotes
  }

  pub fn favorites(&self) -> &[SavedRecord] {
    &self.favorites
  }

  pub fn find(&self, id: &str) -> Option<&SavedRecord> {
    self.quotes.iter().find(|r| r.id == id)
  }

  pub fn save_quote(
    &mut self,
    text: &str,
    author: Option<&str>,
    language: Language,
    is_favorite: bool,
  ) -> SavedRecord {
    let record = self.store.save(text, author, language, is_favorite);
    self.reload();
    record
  }

  pub fn toggle_favorite(&mut self, id: &str) {
    self.store.toggle_favorite(id);
    self.reload();
  }

  pub fn delete_quote(&mut self, id: &str) {
    self.store.delete(id);
    self.reload();
  }

  pub fn clear_all(&mut self) {
    self.store.clear_all();
    self.reload();
  }

  pub fn is_quote_saved(&self, text: &str) -> bool {
    self.store.exists(text)
  }

  pub fn is_quote_favorited(&self, text: &str) -> bool {
    self.store.is_favorited(text)
  }

  /// Apply any storage signals already queued. Returns whether the view
  /// was reloaded.
  pub fn sync_pending(&mut self) -> bool {
    let Some(rx) = self.changes.as_mut() else {
      return false;
    };

    let mut dirty = false;
    loop {
      match rx.try_recv() {
        Ok(change) => dirty |= is_foreign(&self.store, &change),
        // Signals were dropped; assume one of them mattered
        Err(TryRecvError::Lagged(_)) => dirty = true,
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
      }
    }

    if dirty {
      self.reload();
    }
    dirty
  }

  /// Wait for the next change made by another context and reload.
  ///
  /// Returns false once the view is unsubscribed or the bus is gone.
  pub async fn next_change(&mut self) -> bool {
    loop {
      let Some(rx) = self.changes.as_mut() else {
        return false;
      };

      match rx.recv().await {
        Ok(change) if is_foreign(&self.store, &change) => break,
        Ok(_) => continue,
        Err(RecvError::Lagged(_)) => break,
        Err(RecvError::Closed) => return false,
      }
    }

    self.reload();
    true
  }

  /// Stop listening for storage signals.
  pub fn unsubscribe(&mut self) {
    self.changes = None;
  }

  fn reload(&mut self) {
    self.quotes = self.store.get_all();
    self.favorites = self
      .quotes
      .iter()
      .filter(|r| r.is_favorite)
      .cloned()
      .collect();
    debug!(
      quotes = self.quotes.len(),
      favorites = self.favorites.len(),
      "Saved quotes reloaded"
    );
  }
}

/// Same key, written by someone other than our own store.
fn is_foreign(store: &RecordStore, change: &StorageChange) -> bool {
  change.key == store.key() && change.origin != store.context()
}
