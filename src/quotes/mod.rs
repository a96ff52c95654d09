//! Fetching quotes through the cache controller.

mod error;
mod parse;
mod session;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheController, CacheSource};
use crate::config::{QuoteEndpoints, QuotesConfig};
use crate::net::{NetworkError, Request};
use crate::records::Language;

pub use error::{ErrorCode, FetchError};
pub use parse::{parse_body, parse_quote, ParsedQuote};
pub use session::QuoteSession;

/// A fetched quote and where it was served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedQuote {
  pub quote: ParsedQuote,
  pub source: CacheSource,
  /// When the served copy was cached, if it didn't come from the network
  pub cached_at: Option<DateTime<Utc>>,
}

/// Quote API client. Every request goes through the cache controller, which
/// also enforces the request deadline.
#[derive(Clone)]
pub struct QuoteClient {
  controller: Arc<CacheController>,
  endpoints: QuoteEndpoints,
}

impl QuoteClient {
  pub fn new(controller: Arc<CacheController>, config: &QuotesConfig) -> Self {
    Self {
      controller,
      endpoints: config.endpoints.clone(),
    }
  }

  pub async fn fetch_quote(&self, language: Language) -> Result<FetchedQuote, FetchError> {
    let endpoint = self.endpoints.for_language(language);
    let url = Url::parse(endpoint)
      .map_err(|e| FetchError::network(format!("Invalid quote endpoint '{}': {}", endpoint, e)))?;
    let request = Request::get(url).with_header("Accept", "application/json");

    let result = match self.controller.handle_fetch(&request).await {
      Ok(result) => result,
      Err(NetworkError::Timeout) => {
        warn!(%language, "Quote request timed out");
        return Err(FetchError::timeout());
      }
      Err(e) => {
        warn!(%language, error = %e, "Quote request failed");
        return Err(FetchError::network(e.to_string()));
      }
    };

    if !result.data.is_success() {
      return Err(FetchError::http(result.data.status));
    }

    let quote = parse_body(&result.data.body)?;
    debug!(%language, source = ?result.source, "Fetched quote");
    Ok(FetchedQuote {
      quote,
      source: result.source,
      cached_at: result.cached_at,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::background::Clients;
  use crate::cache::SqliteStorage;
  use crate::config::CacheConfig;
  use crate::net::testing::FakeNetwork;
  use crate::net::{Response, ResponseKind};
  use std::time::Duration;

  pub(crate) const EN_URL: &str = "https://random-quotes-freeapi.vercel.app/api/random";

  pub(crate) async fn client_with(network: Arc<FakeNetwork>, timeout_secs: u64) -> QuoteClient {
    let cache = CacheConfig {
      manifest: Vec::new(),
      ..CacheConfig::default()
    };
    let controller = CacheController::new(
      &cache,
      Arc::new(SqliteStorage::open_in_memory().unwrap()),
      network,
      Clients::new(),
    )
    .unwrap()
    .with_network_timeout(Duration::from_secs(timeout_secs));
    controller.start().await;

    let config = QuotesConfig {
      timeout_secs,
      ..QuotesConfig::default()
    };
    QuoteClient::new(Arc::new(controller), &config)
  }

  #[tokio::test]
  async fn test_fetch_parses_and_reports_source() {
    let network = Arc::new(FakeNetwork::new());
    network.respond_json(
      EN_URL,
      ResponseKind::Cors,
      r#"{"quote":"Done is better than perfect","author":"Sheryl Sandberg","id":7}"#,
    );
    let client = client_with(Arc::clone(&network), 5).await;

    let fetched = client.fetch_quote(Language::En).await.unwrap();
    assert_eq!(fetched.quote.text, "Done is better than perfect");
    assert_eq!(fetched.quote.author.as_deref(), Some("Sheryl Sandberg"));
    assert_eq!(fetched.source, CacheSource::Network);

    // The quote API is network-first: offline, the last response is replayed
    network.set_offline(true);
    let offline = client.fetch_quote(Language::En).await.unwrap();
    assert_eq!(offline.quote.text, "Done is better than perfect");
    assert_eq!(offline.source, CacheSource::Offline);
    assert!(offline.cached_at.is_some());
  }

  #[tokio::test]
  async fn test_http_error_is_typed() {
    let network = Arc::new(FakeNetwork::new());
    network.respond(EN_URL, Response::new(429, ResponseKind::Cors, ""));
    let client = client_with(network, 5).await;

    let err = client.fetch_quote(Language::En).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Http(429));
  }

  #[tokio::test]
  async fn test_offline_without_cache_is_network_error() {
    let network = Arc::new(FakeNetwork::new());
    network.set_offline(true);
    let client = client_with(network, 5).await;

    let err = client.fetch_quote(Language::En).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Network);
  }

  #[tokio::test(start_paused = true)]
  async fn test_slow_network_times_out() {
    let network = Arc::new(FakeNetwork::new());
    network.respond_json(EN_URL, ResponseKind::Cors, r#"{"content":"late"}"#);
    network.set_delay(Duration::from_secs(30));
    let client = client_with(network, 5).await;

    let err = client.fetch_quote(Language::En).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Timeout);
  }

  #[tokio::test(start_paused = true)]
  async fn test_slow_network_serves_cached_quote() {
    let network = Arc::new(FakeNetwork::new());
    network.respond_json(EN_URL, ResponseKind::Cors, r#"{"content":"cached one"}"#);
    let client = client_with(Arc::clone(&network), 5).await;
    let live = client.fetch_quote(Language::En).await.unwrap();
    assert_eq!(live.source, CacheSource::Network);

    network.set_delay(Duration::from_secs(30));
    let slow = client.fetch_quote(Language::En).await.unwrap();
    assert_eq!(slow.quote.text, "cached one");
    assert_eq!(slow.source, CacheSource::Offline);
  }

  #[tokio::test]
  async fn test_transport_timeout_maps_to_timeout_code() {
    let network = Arc::new(FakeNetwork::new());
    network.fail(EN_URL, NetworkError::Timeout);
    let client = client_with(network, 5).await;

    let err = client.fetch_quote(Language::En).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Timeout);
  }
}
