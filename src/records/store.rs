//! Bounded, deduplicating store of saved quotes.

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

use super::backend::{KeyValueStore, StorageError};
use super::signal::{ContextId, StorageBus, StorageChange};
use super::types::{decode_records, Language, SavedRecord};

/// Saved quotes persisted as a JSON array under a single durable key.
///
/// Reads never fail: a missing or corrupted payload reads as an empty list.
/// Writes are best-effort; a quota failure is retried once with half the
/// capacity and otherwise dropped.
pub struct RecordStore {
  backend: Arc<dyn KeyValueStore>,
  key: String,
  max_records: usize,
  context: ContextId,
  bus: Option<StorageBus>,
}

impl RecordStore {
  pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>, max_records: usize) -> Self {
    Self {
      backend,
      key: key.into(),
      max_records: max_records.max(1),
      context: ContextId::next(),
      bus: None,
    }
  }

  /// Publish a storage-change signal after every durable write.
  pub fn with_bus(mut self, bus: StorageBus) -> Self {
    self.bus = Some(bus);
    self
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn context(&self) -> ContextId {
    self.context
  }

  pub fn bus(&self) -> Option<&StorageBus> {
    self.bus.as_ref()
  }

  /// All saved records, newest first.
  pub fn get_all(&self) -> Vec<SavedRecord> {
    match self.backend.get(&self.key) {
      Ok(Some(payload)) => {
        // Other writers may not keep the list ordered
        let mut records = decode_records(&payload);
        records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        records
      }
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!(error = %e, key = %self.key, "Failed to read saved quotes");
        Vec::new()
      }
    }
  }

  /// Save a quote. Saving text that is already stored returns the existing
  /// record untouched.
  pub fn save(
    &self,
    text: &str,
    author: Option<&str>,
    language: Language,
    is_favorite: bool,
  ) -> SavedRecord {
    let mut records = self.get_all();

    if let Some(existing) = records.iter().find(|r| r.matches_text(text)) {
      debug!(id = %existing.id, "Quote already saved");
      return existing.clone();
    }

    let now = Utc::now().timestamp_millis();
    let record = SavedRecord {
      id: generate_id(now),
      text: text.to_string(),
      author: author.map(String::from),
      saved_at: now,
      is_favorite,
      language,
    };

    records.insert(0, record.clone());
    self.persist(records);

    record
  }

  /// Flip the favorite flag of the record with `id`, if there is one.
  pub fn toggle_favorite(&self, id: &str) {
    let mut records = self.get_all();

    if let Some(record) = records.iter_mut().find(|r| r.id == id) {
      record.is_favorite = !record.is_favorite;
      self.persist(records);
    }
  }

  pub fn delete(&self, id: &str) {
    let mut records = self.get_all();
    let before = records.len();
    records.retain(|r| r.id != id);

    if records.len() != before {
      self.persist(records);
    }
  }

  pub fn clear_all(&self) {
    match self.backend.remove(&self.key) {
      Ok(()) => self.notify(),
      Err(e) => warn!(error = %e, "Failed to clear saved quotes"),
    }
  }

  pub fn exists(&self, text: &str) -> bool {
    self.get_all().iter().any(|r| r.matches_text(text))
  }

  pub fn is_favorited(&self, text: &str) -> bool {
    self
      .get_all()
      .iter()
      .find(|r| r.matches_text(text))
      .map(|r| r.is_favorite)
      .unwrap_or(false)
  }

  /// Order newest-first, cap at `max_records` and write.
  fn persist(&self, mut records: Vec<SavedRecord>) {
    // Stable, so records saved within the same millisecond keep their order
    records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
    records.truncate(self.max_records);

    match self.write(&records) {
      Ok(()) => {}
      Err(StorageError::QuotaExceeded { requested, quota }) => {
        let reduced = self.max_records / 2;
        warn!(
          requested,
          quota, reduced, "Storage quota exceeded, retrying with fewer quotes"
        );
        records.truncate(reduced);
        if let Err(e) = self.write(&records) {
          warn!(error = %e, "Dropping write of saved quotes");
          return;
        }
      }
      Err(e) => {
        warn!(error = %e, "Failed to save quotes");
        return;
      }
    }

    self.notify();
  }

  fn write(&self, records: &[SavedRecord]) -> Result<(), StorageError> {
    let payload =
      serde_json::to_string(records).map_err(|e| StorageError::Backend(e.to_string()))?;
    self.backend.set(&self.key, &payload)
  }

  fn notify(&self) {
    if let Some(bus) = &self.bus {
      bus.publish(StorageChange {
        key: self.key.clone(),
        origin: self.context,
      });
    }
  }
}

/// `<millis>_<9 base-36 chars>`
fn generate_id(now: i64) -> String {
  let mut rng = rand::rng();
  let suffix: String = (0..9)
    .map(|_| char::from_digit(rng.random_range(0..36), 36).unwrap_or('0'))
    .collect();
  format!("{}_{}", now, suffix)
}
