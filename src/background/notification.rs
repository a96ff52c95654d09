use chrono::{DateTime, Utc};
use color_eyre::Result;
use tracing::info;

/// A system notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub vibrate: Vec<u32>,
  pub arrived_at: DateTime<Utc>,
}

/// Displays notifications to the user.
pub trait Notifier: Send + Sync {
  fn show(&self, notification: &Notification) -> Result<()>;
}

/// Prints notifications to the terminal and records them in the log.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
  fn show(&self, notification: &Notification) -> Result<()> {
    info!(
      title = %notification.title,
      body = %notification.body,
      "Showing notification"
    );
    println!("[{}] {}", notification.title, notification.body);
    Ok(())
  }
}
