use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use url::{Origin, Url};

use super::types::{NetworkError, Request, Response, ResponseKind};
use super::Network;

/// Network access over reqwest.
#[derive(Clone)]
pub struct HttpNetwork {
  client: reqwest::Client,
  origin: Origin,
}

impl HttpNetwork {
  /// `origin` decides which responses count as same-origin.
  pub fn new(origin: &Url, timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      origin: origin.origin(),
    })
  }
}

#[async_trait]
impl Network for HttpNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone());
    for (name, value) in &request.headers {
      builder = builder.header(name, value);
    }

    let response = builder.send().await.map_err(|e| {
      if e.is_timeout() {
        NetworkError::Timeout
      } else {
        NetworkError::Unreachable(e.to_string())
      }
    })?;

    let status = response.status().as_u16();
    let kind = if response.url().origin() == self.origin {
      ResponseKind::Basic
    } else {
      ResponseKind::Cors
    };
    let headers = response
      .headers()
      .iter()
      .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
      .collect();

    let body = response.bytes().await.map_err(|e| {
      if e.is_timeout() {
        NetworkError::Timeout
      } else {
        NetworkError::Body(e.to_string())
      }
    })?;

    Ok(Response {
      status,
      kind,
      headers,
      body: body.to_vec(),
    })
  }
}
