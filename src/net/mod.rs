//! Network transport beneath the cache controller.

mod http;
#[cfg(test)]
pub mod testing;
mod types;

use async_trait::async_trait;

pub use http::HttpNetwork;
pub use types::{Destination, NetworkError, Request, Response, ResponseKind};

/// Something that can perform a request over the network.
///
/// Non-2xx statuses are responses, not errors; only transport failures
/// produce a [`NetworkError`].
#[async_trait]
pub trait Network: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}
