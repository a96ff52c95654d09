//! Out-of-band work: refreshing quotes when connectivity returns and
//! showing push notifications.

mod clients;
mod notification;

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::BackgroundConfig;
use crate::net::{Network, Request};

pub use clients::{ClientHandle, ClientMessage, Clients};
pub use notification::{Notification, Notifier, TerminalNotifier};

/// Handles sync and push signals on behalf of all open clients.
pub struct BackgroundChannel {
  network: Arc<dyn Network>,
  clients: Clients,
  notifier: Box<dyn Notifier>,
  config: BackgroundConfig,
}

impl BackgroundChannel {
  pub fn new(
    config: BackgroundConfig,
    network: Arc<dyn Network>,
    clients: Clients,
    notifier: Box<dyn Notifier>,
  ) -> Self {
    Self {
      network,
      clients,
      notifier,
      config,
    }
  }

  /// Connectivity came back. For the quote refresh tag, fetch one quote and
  /// hand it to every open client. Returns how many clients got it.
  pub async fn handle_sync(&self, tag: &str) -> Result<usize> {
    if tag != self.config.sync_tag {
      debug!(tag, "Ignoring unknown sync tag");
      return Ok(0);
    }

    let url = Url::parse(&self.config.sync_url)
      .map_err(|e| eyre!("Invalid sync url '{}': {}", self.config.sync_url, e))?;
    let request = Request::get(url).with_header("Accept", "application/json");

    let response = self
      .network
      .fetch(&request)
      .await
      .map_err(|e| eyre!("Background quote refresh failed: {}", e))?;
    if !response.is_success() {
      return Err(eyre!(
        "Background quote refresh failed: status {}",
        response.status
      ));
    }

    let data: serde_json::Value = serde_json::from_slice(&response.body)
      .map_err(|e| eyre!("Background quote refresh returned invalid JSON: {}", e))?;

    let delivered = self.clients.post_all(&ClientMessage::NewQuote(data));
    info!(delivered, "Broadcast refreshed quote");
    Ok(delivered)
  }

  /// Show a notification for an inbound push. Never fails.
  pub fn handle_push(&self, payload: Option<&str>) {
    // Only a missing payload gets the default; an empty one is shown as sent
    let body = payload.unwrap_or(self.config.default_push_body.as_str());

    let notification = Notification {
      title: self.config.notification_title.clone(),
      body: body.to_string(),
      icon: self.config.icon.clone(),
      badge: self.config.icon.clone(),
      vibrate: vec![100, 50, 100],
      arrived_at: Utc::now(),
    };

    if let Err(e) = self.notifier.show(&notification) {
      warn!(error = %e, "Failed to show notification");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::net::testing::FakeNetwork;
  use crate::net::{NetworkError, Response, ResponseKind};
  use serde_json::json;
  use std::sync::Mutex;

  #[derive(Clone, Default)]
  struct RecordingNotifier {
    shown: Arc<Mutex<Vec<Notification>>>,
  }

  impl Notifier for RecordingNotifier {
    fn show(&self, notification: &Notification) -> Result<()> {
      self.shown.lock().unwrap().push(notification.clone());
      Ok(())
    }
  }

  struct FailingNotifier;

  impl Notifier for FailingNotifier {
    fn show(&self, _notification: &Notification) -> Result<()> {
      Err(eyre!("no display"))
    }
  }

  fn channel(network: Arc<FakeNetwork>, clients: Clients) -> (BackgroundChannel, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let channel = BackgroundChannel::new(
      BackgroundConfig::default(),
      network,
      clients,
      Box::new(notifier.clone()),
    );
    (channel, notifier)
  }

  #[tokio::test]
  async fn test_sync_broadcasts_new_quote() {
    let network = Arc::new(FakeNetwork::new());
    network.respond_json(
      "https://random-quote.hyobb.com/",
      ResponseKind::Cors,
      r#"{"content":"Keep going","author":"Someone"}"#,
    );
    let clients = Clients::new();
    let mut first = clients.register();
    let mut second = clients.register();
    let (channel, _) = channel(network, clients);

    let delivered = channel.handle_sync("get-new-quote").await.unwrap();
    assert_eq!(delivered, 2);

    let expected = ClientMessage::NewQuote(json!({"content": "Keep going", "author": "Someone"}));
    assert_eq!(first.recv().await, Some(expected.clone()));
    assert_eq!(second.recv().await, Some(expected));
  }

  #[tokio::test]
  async fn test_sync_ignores_other_tags() {
    let network = Arc::new(FakeNetwork::new());
    let (channel, _) = channel(Arc::clone(&network), Clients::new());

    assert_eq!(channel.handle_sync("something-else").await.unwrap(), 0);
    assert!(network.calls().is_empty());
  }

  #[tokio::test]
  async fn test_sync_failure_delivers_nothing() {
    let network = Arc::new(FakeNetwork::new());
    network.fail(
      "https://random-quote.hyobb.com/",
      NetworkError::Unreachable("offline".to_string()),
    );
    let clients = Clients::new();
    let mut client = clients.register();
    let (channel, _) = channel(network, clients);

    assert!(channel.handle_sync("get-new-quote").await.is_err());
    assert!(client.try_recv().is_none());
  }

  #[tokio::test]
  async fn test_sync_rejects_error_status() {
    let network = Arc::new(FakeNetwork::new());
    network.respond(
      "https://random-quote.hyobb.com/",
      Response::new(500, ResponseKind::Cors, "{}"),
    );
    let (channel, _) = channel(network, Clients::new());
    assert!(channel.handle_sync("get-new-quote").await.is_err());
  }

  #[test]
  fn test_push_uses_payload_or_default() {
    let (channel, notifier) = channel(Arc::new(FakeNetwork::new()), Clients::new());

    channel.handle_push(Some("Fresh wisdom inside"));
    channel.handle_push(None);

    let shown = notifier.shown.lock().unwrap();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[0].title, "Wisdom Whispers");
    assert_eq!(shown[0].body, "Fresh wisdom inside");
    assert_eq!(shown[1].body, "New inspirational quote available!");
    assert_eq!(shown[1].icon, "/icon-192.png");
    assert_eq!(shown[1].vibrate, vec![100, 50, 100]);
  }

  #[test]
  fn test_empty_push_payload_is_kept() {
    let (channel, notifier) = channel(Arc::new(FakeNetwork::new()), Clients::new());

    channel.handle_push(Some(""));

    let shown = notifier.shown.lock().unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].body, "");
  }

  #[test]
  fn test_push_swallows_notifier_errors() {
    let channel = BackgroundChannel::new(
      BackgroundConfig::default(),
      Arc::new(FakeNetwork::new()),
      Clients::new(),
      Box::new(FailingNotifier),
    );
    channel.handle_push(Some("ignored"));
  }
}
