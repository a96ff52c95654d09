use std::fmt;
use thiserror::Error;

/// Machine-readable failure code shown alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
  Timeout,
  Network,
  Http(u16),
  InvalidResponse,
  FetchFailed,
  RetryExhausted,
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorCode::Timeout => write!(f, "TIMEOUT"),
      ErrorCode::Network => write!(f, "NETWORK_ERROR"),
      ErrorCode::Http(status) => write!(f, "HTTP_{}", status),
      ErrorCode::InvalidResponse => write!(f, "INVALID_RESPONSE"),
      ErrorCode::FetchFailed => write!(f, "FETCH_FAILED"),
      ErrorCode::RetryExhausted => write!(f, "RETRY_EXHAUSTED"),
    }
  }
}

/// A quote fetch that failed in a way the user should see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({code})")]
pub struct FetchError {
  pub code: ErrorCode,
  pub message: String,
}

impl FetchError {
  pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
    Self {
      code,
      message: message.into(),
    }
  }

  pub fn timeout() -> Self {
    Self::new(ErrorCode::Timeout, "Request timeout")
  }

  pub fn network(message: impl Into<String>) -> Self {
    Self::new(ErrorCode::Network, message)
  }

  pub fn http(status: u16) -> Self {
    Self::new(
      ErrorCode::Http(status),
      format!("HTTP error! status: {}", status),
    )
  }

  pub fn invalid_response() -> Self {
    Self::new(ErrorCode::InvalidResponse, "Invalid response format")
  }

  pub fn retry_exhausted(attempts: u32) -> Self {
    Self::new(
      ErrorCode::RetryExhausted,
      format!("Giving up after {} failed attempts", attempts),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_codes_render_like_the_wire_format() {
    assert_eq!(FetchError::timeout().code.to_string(), "TIMEOUT");
    assert_eq!(FetchError::network("x").code.to_string(), "NETWORK_ERROR");
    assert_eq!(FetchError::http(404).code.to_string(), "HTTP_404");
    assert_eq!(
      FetchError::invalid_response().code.to_string(),
      "INVALID_RESPONSE"
    );
  }

  #[test]
  fn test_display_includes_message_and_code() {
    assert_eq!(
      FetchError::http(500).to_string(),
      "HTTP error! status: 500 (HTTP_500)"
    );
  }
}
