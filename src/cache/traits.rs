//! Core types for the response cache.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::net::Request;

/// Cache key for a request: method plus URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
  description: String,
}

impl RequestKey {
  pub fn new(description: impl Into<String>) -> Self {
    Self {
      description: description.into(),
    }
  }

  /// Human-readable form, e.g. `GET https://example.com/`.
  pub fn description(&self) -> &str {
    &self.description
  }

  /// SHA256 hash for stable, fixed-length keys.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.description.as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl From<&Request> for RequestKey {
  fn from(request: &Request) -> Self {
    Self::new(request.key())
  }
}

/// Result of an intercepted fetch, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Fresh data from the network.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Served from the cache without asking the network.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Network failed, serving the last cached copy.
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
    }
  }

  /// Nothing could serve the request; this is the offline fallback document.
  pub fn fallback(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Fallback,
      cached_at: Some(cached_at),
    }
  }

  /// Not intercepted at all.
  pub fn passthrough(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Passthrough,
      cached_at: None,
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Cache hit, network untouched
  Cache,
  /// Network unavailable, serving cached data
  Offline,
  /// Offline fallback document
  Fallback,
  /// Request was not intercepted
  Passthrough,
}
