use tracing::{info, warn};

use super::{FetchError, FetchedQuote, QuoteClient};
use crate::records::Language;

/// The quote currently on screen, the last error, and the retry budget.
///
/// Each failed fetch uses up one retry; a success refills the budget. Once
/// the budget is spent, further retries are refused until the user starts a
/// fresh fetch.
pub struct QuoteSession {
  client: QuoteClient,
  language: Language,
  current: Option<FetchedQuote>,
  error: Option<FetchError>,
  retry_count: u32,
  max_retries: u32,
}

impl QuoteSession {
  pub fn new(client: QuoteClient, language: Language, max_retries: u32) -> Self {
    Self {
      client,
      language,
      current: None,
      error: None,
      retry_count: 0,
      max_retries,
    }
  }

  pub fn current(&self) -> Option<&FetchedQuote> {
    self.current.as_ref()
  }

  pub fn error(&self) -> Option<&FetchError> {
    self.error.as_ref()
  }

  pub fn retry_count(&self) -> u32 {
    self.retry_count
  }

  pub fn can_retry(&self) -> bool {
    self.retry_count < self.max_retries
  }

  /// Fetch a new quote. On failure the previous quote stays visible.
  pub async fn fetch_new_quote(&mut self) -> Result<&FetchedQuote, FetchError> {
    self.error = None;

    match self.client.fetch_quote(self.language).await {
      Ok(fetched) => {
        self.retry_count = 0;
        let current = self.current.insert(fetched);
        Ok(&*current)
      }
      Err(e) => {
        self.retry_count += 1;
        warn!(code = %e.code, attempt = self.retry_count, "Quote fetch failed");
        self.error = Some(e.clone());
        Err(e)
      }
    }
  }

  /// Retry after a failure, if the budget allows.
  pub async fn retry(&mut self) -> Result<&FetchedQuote, FetchError> {
    if !self.can_retry() {
      return Err(FetchError::retry_exhausted(self.retry_count));
    }
    self.fetch_new_quote().await
  }

  /// Fetch, retrying automatically until the budget runs out.
  pub async fn fetch_with_retries(&mut self) -> Result<FetchedQuote, FetchError> {
    let mut outcome = self.fetch_new_quote().await.cloned();
    loop {
      match outcome {
        Ok(fetched) => return Ok(fetched),
        Err(e) if !self.can_retry() => {
          info!(attempts = self.retry_count, "Retry budget exhausted");
          return Err(e);
        }
        Err(_) => outcome = self.retry().await.cloned(),
      }
    }
  }
}
