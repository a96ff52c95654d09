//! Cache controller that intercepts requests and manages the versioned bucket.

use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use reqwest::Method;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::storage::{CacheStorage, CachedResponse};
use super::traits::{CacheResult, RequestKey};
use crate::background::Clients;
use crate::config::CacheConfig;
use crate::net::{Destination, Network, NetworkError, Request, Response, ResponseKind};

/// Manifest entries containing any of these were never filled in at build time.
const UNRESOLVED_PLACEHOLDERS: &[&str] = &["undefined", "${", "{{"];

/// Lifecycle of the controller, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  Parsed,
  Installing,
  Installed,
  Activating,
  Activated,
}

/// Sits between the application and the network.
///
/// Once activated, read requests are answered network-first for the quote
/// API and cache-first for everything else; other methods go straight to the
/// network. Only one bucket (the current version) is live at a time.
pub struct CacheController {
  storage: Arc<dyn CacheStorage>,
  network: Arc<dyn Network>,
  clients: Clients,
  bucket: String,
  origin: Url,
  manifest: Vec<String>,
  api_patterns: Vec<String>,
  offline_fallback: String,
  /// Deadline for a single network attempt; a miss counts as a network failure
  network_timeout: Option<Duration>,
  state: Mutex<LifecycleState>,
}

impl CacheController {
  pub fn new(
    config: &CacheConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Clients,
  ) -> Result<Self> {
    let origin = Url::parse(&config.origin)
      .map_err(|e| eyre!("Invalid cache origin '{}': {}", config.origin, e))?;

    Ok(Self {
      storage,
      network,
      clients,
      bucket: config.bucket_name(),
      origin,
      manifest: config.manifest.clone(),
      api_patterns: config.api_patterns.clone(),
      offline_fallback: config.offline_fallback.clone(),
      network_timeout: None,
      state: Mutex::new(LifecycleState::Parsed),
    })
  }

  /// Give up on the network after `timeout`. For network-first requests the
  /// cached copy is served instead.
  pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
    self.network_timeout = Some(timeout);
    self
  }

  /// Name of the live bucket.
  pub fn bucket(&self) -> &str {
    &self.bucket
  }

  pub fn state(&self) -> LifecycleState {
    match self.state.lock() {
      Ok(state) => *state,
      Err(poisoned) => *poisoned.into_inner(),
    }
  }

  fn set_state(&self, next: LifecycleState) {
    debug!(?next, bucket = %self.bucket, "Cache controller state change");
    match self.state.lock() {
      Ok(mut state) => *state = next,
      Err(poisoned) => *poisoned.into_inner() = next,
    }
  }

  /// Warm the bucket with the static manifest.
  ///
  /// The manifest is stored all-or-nothing. A failure is logged and install
  /// still completes: a cold cache only costs performance.
  pub async fn install(&self) {
    self.set_state(LifecycleState::Installing);

    if let Err(e) = self.precache().await {
      warn!(error = %e, bucket = %self.bucket, "Cache error during install");
    }

    // Skip waiting: eligible to activate right away
    self.set_state(LifecycleState::Installed);
  }

  async fn precache(&self) -> Result<usize> {
    self.storage.open_bucket(&self.bucket)?;

    let requests: Vec<Request> = self
      .manifest
      .iter()
      .filter_map(|entry| self.resolve_manifest_entry(entry))
      .collect();

    let responses = join_all(requests.iter().map(|r| self.fetch_network(r))).await;

    let mut entries = Vec::with_capacity(requests.len());
    for (request, response) in requests.iter().zip(responses) {
      let response = response.map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;
      if !response.is_success() {
        return Err(eyre!(
          "Failed to fetch {}: status {}",
          request.url,
          response.status
        ));
      }
      entries.push((RequestKey::from(request), response));
    }

    let count = entries.len();
    self.storage.put_all(&self.bucket, entries)?;
    info!(count, bucket = %self.bucket, "Precached static assets");
    Ok(count)
  }

  fn resolve_manifest_entry(&self, entry: &str) -> Option<Request> {
    if UNRESOLVED_PLACEHOLDERS.iter().any(|p| entry.contains(p)) {
      debug!(entry, "Skipping unresolved manifest entry");
      return None;
    }

    match self.origin.join(entry) {
      Ok(url) => Some(Request::get(url)),
      Err(e) => {
        warn!(entry, error = %e, "Skipping invalid manifest entry");
        None
      }
    }
  }

  /// Purge every bucket but the current one and take control of all open
  /// clients. Returns the names of the buckets that were deleted.
  pub fn activate(&self) -> Vec<String> {
    self.set_state(LifecycleState::Activating);

    let mut deleted = Vec::new();
    match self.storage.bucket_names() {
      Ok(names) => {
        for name in names.into_iter().filter(|n| n != &self.bucket) {
          info!(bucket = %name, "Deleting old cache");
          match self.storage.delete_bucket(&name) {
            Ok(_) => deleted.push(name),
            Err(e) => warn!(bucket = %name, error = %e, "Failed to delete old cache"),
          }
        }
      }
      Err(e) => warn!(error = %e, "Failed to list caches during activation"),
    }

    self.clients.claim(&self.bucket);
    self.set_state(LifecycleState::Activated);
    deleted
  }

  /// Bring the controller to `Activated`.
  ///
  /// When the live bucket already exists and nothing stale is left, the
  /// previous activation still stands and only clients are claimed again.
  /// Otherwise this is a fresh version: install, then activate.
  pub async fn start(&self) {
    let existing = self.storage.bucket_names().unwrap_or_else(|e| {
      warn!(error = %e, "Failed to list caches");
      Vec::new()
    });

    if existing.len() == 1 && existing[0] == self.bucket {
      self.clients.claim(&self.bucket);
      self.set_state(LifecycleState::Activated);
      return;
    }

    self.install().await;
    self.activate();
  }

  /// Handle a request on behalf of the application.
  pub async fn handle_fetch(&self, request: &Request) -> Result<CacheResult<Response>, NetworkError> {
    if request.method != Method::GET || self.state() != LifecycleState::Activated {
      return self
        .fetch_network(request)
        .await
        .map(CacheResult::passthrough);
    }

    let result = if self.is_quote_api(&request.url) {
      self.network_first(request).await
    } else {
      self.cache_first(request).await
    };

    match result {
      Ok(result) => Ok(result),
      Err(e) if request.destination == Destination::Document => match self.offline_document() {
        Some(cached) => {
          info!(url = %request.url, "Serving offline fallback document");
          Ok(CacheResult::fallback(cached.response, cached.cached_at))
        }
        None => Err(e),
      },
      Err(e) => Err(e),
    }
  }

  fn is_quote_api(&self, url: &Url) -> bool {
    let url = url.as_str();
    self.api_patterns.iter().any(|p| url.contains(p.as_str()))
  }

  /// Try the network, fall back to the last cached copy.
  async fn network_first(&self, request: &Request) -> Result<CacheResult<Response>, NetworkError> {
    match self.fetch_network(request).await {
      Ok(response) => {
        if response.is_success() {
          self.store(request, response.clone());
        }
        Ok(CacheResult::from_network(response))
      }
      Err(e) => match self.lookup(request) {
        Some(cached) => {
          info!(url = %request.url, error = %e, "Network failed, serving cached quote");
          Ok(CacheResult::offline(cached.response, cached.cached_at))
        }
        None => Err(e),
      },
    }
  }

  /// Serve from the bucket when possible, otherwise fetch and remember
  /// successful same-origin responses.
  async fn cache_first(&self, request: &Request) -> Result<CacheResult<Response>, NetworkError> {
    if let Some(cached) = self.lookup(request) {
      return Ok(CacheResult::from_cache(cached.response, cached.cached_at));
    }

    let response = self.fetch_network(request).await?;
    if response.is_success() && response.kind == ResponseKind::Basic {
      self.store(request, response.clone());
    }
    Ok(CacheResult::from_network(response))
  }

  async fn fetch_network(&self, request: &Request) -> Result<Response, NetworkError> {
    match self.network_timeout {
      Some(limit) => tokio::time::timeout(limit, self.network.fetch(request))
        .await
        .unwrap_or(Err(NetworkError::Timeout)),
      None => self.network.fetch(request).await,
    }
  }

  fn lookup(&self, request: &Request) -> Option<CachedResponse> {
    self
      .storage
      .match_request(&self.bucket, &RequestKey::from(request))
      .unwrap_or_else(|e| {
        warn!(url = %request.url, error = %e, "Cache lookup failed");
        None
      })
  }

  fn store(&self, request: &Request, response: Response) {
    if let Err(e) = self
      .storage
      .put(&self.bucket, &RequestKey::from(request), response)
    {
      warn!(url = %request.url, error = %e, "Failed to cache response");
    }
  }

  fn offline_document(&self) -> Option<CachedResponse> {
    let url = self.origin.join(&self.offline_fallback).ok()?;
    self.lookup(&Request::get(url))
  }
}
