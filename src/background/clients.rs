use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

/// Message delivered to open application instances.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
  /// A fresh quote fetched in the background
  NewQuote(serde_json::Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// An open application instance's end of the registry.
pub struct ClientHandle {
  id: ClientId,
  rx: mpsc::UnboundedReceiver<ClientMessage>,
}

impl ClientHandle {
  pub fn id(&self) -> ClientId {
    self.id
  }

  /// Wait for the next message.
  pub async fn recv(&mut self) -> Option<ClientMessage> {
    self.rx.recv().await
  }

  /// Take a message if one is already waiting.
  pub fn try_recv(&mut self) -> Option<ClientMessage> {
    self.rx.try_recv().ok()
  }
}

struct ClientEntry {
  id: ClientId,
  tx: mpsc::UnboundedSender<ClientMessage>,
  controller: Option<String>,
}

#[derive(Default)]
struct Registry {
  next_id: u64,
  clients: Vec<ClientEntry>,
  /// Cache version controlling newly opened clients
  controller: Option<String>,
}

/// Registry of open application instances.
#[derive(Clone, Default)]
pub struct Clients {
  inner: Arc<Mutex<Registry>>,
}

impl Clients {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Registry> {
    self
      .inner
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Open a new client. It is controlled by the active cache version, if any.
  pub fn register(&self) -> ClientHandle {
    let mut registry = self.lock();
    registry.next_id += 1;
    let id = ClientId(registry.next_id);
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = registry.controller.clone();
    registry.clients.push(ClientEntry { id, tx, controller });
    ClientHandle { id, rx }
  }

  /// Put every open client under `version` immediately.
  pub fn claim(&self, version: &str) {
    let mut registry = self.lock();
    registry.controller = Some(version.to_string());
    for client in &mut registry.clients {
      client.controller = Some(version.to_string());
    }
    debug!(version, clients = registry.clients.len(), "Claimed clients");
  }

  pub fn controller_of(&self, id: ClientId) -> Option<String> {
    self
      .lock()
      .clients
      .iter()
      .find(|c| c.id == id)
      .and_then(|c| c.controller.clone())
  }

  /// Number of clients still open.
  pub fn count(&self) -> usize {
    let mut registry = self.lock();
    registry.clients.retain(|c| !c.tx.is_closed());
    registry.clients.len()
  }

  /// Deliver `message` to every open client, dropping closed ones.
  /// Returns how many received it.
  pub fn post_all(&self, message: &ClientMessage) -> usize {
    let mut registry = self.lock();
    registry
      .clients
      .retain(|c| c.tx.send(message.clone()).is_ok());
    registry.clients.len()
  }
}
