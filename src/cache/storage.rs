//! Cache bucket storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::traits::RequestKey;
use crate::net::{Response, ResponseKind};

/// A stored response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: Response,
  /// When the response was cached
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Responses live in named buckets; a bucket name carries the cache version.
pub trait CacheStorage: Send + Sync {
  /// Create the bucket if it doesn't exist yet.
  fn open_bucket(&self, bucket: &str) -> Result<()>;

  /// Names of every existing bucket.
  fn bucket_names(&self) -> Result<Vec<String>>;

  /// Delete a bucket and all of its entries. Returns whether it existed.
  fn delete_bucket(&self, bucket: &str) -> Result<bool>;

  /// Look up a stored response.
  fn match_request(&self, bucket: &str, key: &RequestKey) -> Result<Option<CachedResponse>>;

  /// Store a response, replacing any previous entry for the key.
  fn put(&self, bucket: &str, key: &RequestKey, response: Response) -> Result<()>;

  /// Store several responses atomically: either all are written or none.
  fn put_all(&self, bucket: &str, entries: Vec<(RequestKey, Response)>) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn open_bucket(&self, _bucket: &str) -> Result<()> {
    Ok(())
  }

  fn bucket_names(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }

  fn delete_bucket(&self, _bucket: &str) -> Result<bool> {
    Ok(false)
  }

  fn match_request(&self, _bucket: &str, _key: &RequestKey) -> Result<Option<CachedResponse>> {
    Ok(None) // Always miss
  }

  fn put(&self, _bucket: &str, _key: &RequestKey, _response: Response) -> Result<()> {
    Ok(()) // Discard
  }

  fn put_all(&self, _bucket: &str, _entries: Vec<(RequestKey, Response)>) -> Result<()> {
    Ok(()) // Discard
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open or create the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self
      .lock()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;
    Ok(())
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_buckets (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per cached request, keyed by the hash of "<METHOD> <URL>"
CREATE TABLE IF NOT EXISTS cache_entries (
    bucket TEXT NOT NULL,
    key_hash TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    kind TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (bucket, key_hash)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_bucket ON cache_entries(bucket);
"#;

fn insert_entry(
  conn: &Connection,
  bucket: &str,
  key: &RequestKey,
  response: &Response,
) -> Result<()> {
  let headers = serde_json::to_string(&response.headers)
    .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

  conn
    .execute(
      "INSERT OR IGNORE INTO cache_buckets (name) VALUES (?)",
      params![bucket],
    )
    .map_err(|e| eyre!("Failed to open bucket {}: {}", bucket, e))?;

  conn
    .execute(
      "INSERT OR REPLACE INTO cache_entries
         (bucket, key_hash, request_key, status, kind, headers, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        bucket,
        key.cache_hash(),
        key.description(),
        response.status,
        response.kind.as_str(),
        headers,
        response.body,
      ],
    )
    .map_err(|e| eyre!("Failed to store response for {}: {}", key.description(), e))?;

  Ok(())
}

impl CacheStorage for SqliteStorage {
  fn open_bucket(&self, bucket: &str) -> Result<()> {
    self
      .lock()?
      .execute(
        "INSERT OR IGNORE INTO cache_buckets (name) VALUES (?)",
        params![bucket],
      )
      .map_err(|e| eyre!("Failed to open bucket {}: {}", bucket, e))?;
    Ok(())
  }

  fn bucket_names(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT name FROM cache_buckets ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list buckets: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read bucket name: {}", e))?;

    Ok(names)
  }

  fn delete_bucket(&self, bucket: &str) -> Result<bool> {
    let conn = self.lock()?;
    let tx = conn
      .unchecked_transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM cache_entries WHERE bucket = ?", params![bucket])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", bucket, e))?;
    let removed = tx
      .execute("DELETE FROM cache_buckets WHERE name = ?", params![bucket])
      .map_err(|e| eyre!("Failed to delete bucket {}: {}", bucket, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn match_request(&self, bucket: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare(
        "SELECT status, kind, headers, body, cached_at FROM cache_entries
         WHERE bucket = ? AND key_hash = ?",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let row: Option<(u16, String, String, Vec<u8>, String)> = stmt
      .query_row(params![bucket, key.cache_hash()], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
      })
      .optional()
      .map_err(|e| eyre!("Failed to query cache: {}", e))?;

    let Some((status, kind, headers, body, cached_at)) = row else {
      return Ok(None);
    };

    let kind = ResponseKind::parse(&kind)
      .ok_or_else(|| eyre!("Unknown response kind '{}' in cache", kind))?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers)
      .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;

    Ok(Some(CachedResponse {
      response: Response {
        status,
        kind,
        headers,
        body,
      },
      cached_at: parse_datetime(&cached_at)?,
    }))
  }

  fn put(&self, bucket: &str, key: &RequestKey, response: Response) -> Result<()> {
    let conn = self.lock()?;
    insert_entry(&conn, bucket, key, &response)
  }

  fn put_all(&self, bucket: &str, entries: Vec<(RequestKey, Response)>) -> Result<()> {
    let conn = self.lock()?;
    let tx = conn
      .unchecked_transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for (key, response) in &entries {
      insert_entry(&tx, bucket, key, response)?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
