//! Scripted network for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::types::{NetworkError, Request, Response, ResponseKind};
use super::Network;

/// Answers requests from a URL → response table and records every call.
/// Unknown URLs fail as unreachable.
#[derive(Default)]
pub struct FakeNetwork {
  routes: Mutex<HashMap<String, Result<Response, NetworkError>>>,
  calls: Mutex<Vec<String>>,
  offline: AtomicBool,
  delay: Mutex<Option<Duration>>,
}

impl FakeNetwork {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(&self, url: &str, response: Response) {
    self
      .routes
      .lock()
      .unwrap()
      .insert(url.to_string(), Ok(response));
  }

  pub fn respond_json(&self, url: &str, kind: ResponseKind, body: &str) {
    let mut response = Response::new(200, kind, body);
    response
      .headers
      .push(("content-type".to_string(), "application/json".to_string()));
    self.respond(url, response);
  }

  pub fn fail(&self, url: &str, error: NetworkError) {
    self
      .routes
      .lock()
      .unwrap()
      .insert(url.to_string(), Err(error));
  }

  /// Fail every request as if the machine lost connectivity.
  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  /// Hold every response for `delay` before answering.
  pub fn set_delay(&self, delay: Duration) {
    *self.delay.lock().unwrap() = Some(delay);
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self, url: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|c| c.as_str() == url)
      .count()
  }
}

#[async_trait]
impl Network for FakeNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
    let url = request.url.to_string();
    self.calls.lock().unwrap().push(url.clone());

    let delay = *self.delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }

    if self.offline.load(Ordering::SeqCst) {
      return Err(NetworkError::Unreachable("offline".to_string()));
    }

    self
      .routes
      .lock()
      .unwrap()
      .get(&url)
      .cloned()
      .unwrap_or_else(|| Err(NetworkError::Unreachable(format!("no route for {}", url))))
  }
}
