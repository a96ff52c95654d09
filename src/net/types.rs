use reqwest::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// What the requester intends to do with the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Destination {
  /// A top-level page load
  Document,
  #[default]
  Other,
}

/// An outgoing request as seen by the cache controller.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub destination: Destination,
  pub headers: Vec<(String, String)>,
}

impl Request {
  pub fn get(url: Url) -> Self {
    Self::new(Method::GET, url)
  }

  pub fn new(method: Method, url: Url) -> Self {
    Self {
      method,
      url,
      destination: Destination::Other,
      headers: Vec::new(),
    }
  }

  pub fn with_destination(mut self, destination: Destination) -> Self {
    self.destination = destination;
    self
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }

  /// Readable cache key, `"<METHOD> <URL>"`.
  pub fn key(&self) -> String {
    format!("{} {}", self.method, self.url)
  }
}

/// How the response relates to the application's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
  /// Same-origin response
  Basic,
  /// Cross-origin response with a readable body
  Cors,
}

impl ResponseKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseKind::Basic => "basic",
      ResponseKind::Cors => "cors",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "basic" => Some(ResponseKind::Basic),
      "cors" => Some(ResponseKind::Cors),
      _ => None,
    }
  }
}

/// A fully buffered response.
///
/// The body is owned, so `clone()` yields an independent copy: one copy can
/// go into the cache while the other is handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub kind: ResponseKind,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(status: u16, kind: ResponseKind, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      kind,
      headers: Vec::new(),
      body: body.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Failures below HTTP: the request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
  #[error("request timed out")]
  Timeout,

  #[error("network unreachable: {0}")]
  Unreachable(String),

  #[error("failed to read response body: {0}")]
  Body(String),
}
