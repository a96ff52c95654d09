//! Durable key-value storage the record store persists into.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Errors surfaced by a key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
  /// The write would push the backend past its byte quota
  #[error("storage quota exceeded: {requested} bytes requested, {quota} allowed")]
  QuotaExceeded { requested: usize, quota: usize },

  #[error("storage backend error: {0}")]
  Backend(String),
}

impl From<rusqlite::Error> for StorageError {
  fn from(e: rusqlite::Error) -> Self {
    StorageError::Backend(e.to_string())
  }
}

/// String key-value storage with a total byte quota.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

  /// Replace the value under `key`. Fails with `QuotaExceeded` when the
  /// combined size of all values would exceed the quota.
  fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

  fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// SQLite-backed key-value store.
pub struct SqliteKv {
  conn: Mutex<Connection>,
  quota: usize,
}

const KV_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteKv {
  /// Open or create the store at `path`.
  pub fn open(path: &Path, quota: usize) -> Result<Self, StorageError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        StorageError::Backend(format!("Failed to create store directory: {}", e))
      })?;
    }

    let conn = Connection::open(path).map_err(|e| {
      StorageError::Backend(format!(
        "Failed to open store at {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::with_connection(conn, quota)
  }

  #[cfg(test)]
  pub fn open_in_memory(quota: usize) -> Result<Self, StorageError> {
    Self::with_connection(Connection::open_in_memory()?, quota)
  }

  fn with_connection(conn: Connection, quota: usize) -> Result<Self, StorageError> {
    conn.execute_batch(KV_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
      quota,
    })
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
    self
      .conn
      .lock()
      .map_err(|e| StorageError::Backend(format!("Lock poisoned: {}", e)))
  }

  /// SQLite's `data_version` for this connection. It only moves when
  /// another connection commits, which makes it a cheap cross-process
  /// change detector.
  pub fn data_version(&self) -> Result<i64, StorageError> {
    let conn = self.lock()?;
    let version = conn.query_row("PRAGMA data_version", [], |row| row.get(0))?;
    Ok(version)
  }
}

impl KeyValueStore for SqliteKv {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let conn = self.lock()?;
    let value = conn
      .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
        row.get(0)
      })
      .optional()?;
    Ok(value)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let conn = self.lock()?;

    let others: i64 = conn.query_row(
      "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv WHERE key != ?",
      params![key],
      |row| row.get(0),
    )?;
    let requested = others as usize + value.len();
    if requested > self.quota {
      return Err(StorageError::QuotaExceeded {
        requested,
        quota: self.quota,
      });
    }

    conn.execute(
      "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?, ?, datetime('now'))",
      params![key, value],
    )?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let conn = self.lock()?;
    conn.execute("DELETE FROM kv WHERE key = ?", params![key])?;
    Ok(())
  }
}

/// In-memory store for tests.
#[cfg(test)]
pub struct MemoryKv {
  values: Mutex<std::collections::HashMap<String, String>>,
  quota: usize,
}

#[cfg(test)]
impl MemoryKv {
  pub fn new(quota: usize) -> Self {
    Self {
      values: Mutex::new(std::collections::HashMap::new()),
      quota,
    }
  }

  pub fn unlimited() -> Self {
    Self::new(usize::MAX)
  }

  /// Write a raw value, bypassing the quota.
  pub fn put_raw(&self, key: &str, value: &str) {
    self
      .values
      .lock()
      .unwrap()
      .insert(key.to_string(), value.to_string());
  }
}

#[cfg(test)]
impl KeyValueStore for MemoryKv {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    Ok(self.values.lock().unwrap().get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut values = self.values.lock().unwrap();
    let others: usize = values
      .iter()
      .filter(|(k, _)| k.as_str() != key)
      .map(|(_, v)| v.len())
      .sum();
    let requested = others + value.len();
    if requested > self.quota {
      return Err(StorageError::QuotaExceeded {
        requested,
        quota: self.quota,
      });
    }
    values.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    self.values.lock().unwrap().remove(key);
    Ok(())
  }
}
