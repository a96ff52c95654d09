use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::background::{BackgroundChannel, ClientHandle, ClientMessage, Clients, TerminalNotifier};
use crate::cache::{CacheController, CacheSource, CacheStorage, NoopStorage, SqliteStorage};
use crate::commands::Command;
use crate::config::Config;
use crate::net::{HttpNetwork, Network};
use crate::quotes::{QuoteClient, QuoteSession};
use crate::records::{
  spawn_watcher, KeyValueStore, Language, RecordStore, SavedQuotes, SavedRecord, SqliteKv,
  StorageBus,
};

/// Main application state
pub struct App {
  /// Application configuration
  config: Config,

  /// Saved-quote database, shared with the change watcher
  kv: Arc<SqliteKv>,

  /// Storage-change signals for this process
  bus: StorageBus,

  /// View of the saved library
  saved: SavedQuotes,

  /// Registry of open clients; this process is one of them
  clients: Clients,
  client: ClientHandle,

  network: Arc<dyn Network>,
  controller: Arc<CacheController>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let store_path = config.store_path()?;
    ensure_parent(&store_path)?;
    let kv = Arc::new(SqliteKv::open(&store_path, config.storage.quota_bytes)?);

    let bus = StorageBus::new();
    let store = RecordStore::new(
      Arc::clone(&kv) as Arc<dyn KeyValueStore>,
      config.storage.key.clone(),
      config.storage.max_records,
    )
    .with_bus(bus.clone());
    let saved = SavedQuotes::new(store);

    let storage: Arc<dyn CacheStorage> = if config.cache.enabled {
      let cache_path = config.cache_path()?;
      ensure_parent(&cache_path)?;
      Arc::new(SqliteStorage::open(&cache_path)?)
    } else {
      Arc::new(NoopStorage)
    };

    let origin = Url::parse(&config.cache.origin)
      .map_err(|e| eyre!("Invalid cache origin '{}': {}", config.cache.origin, e))?;
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(
      &origin,
      Duration::from_secs(config.quotes.timeout_secs),
    )?);

    let clients = Clients::new();
    let client = clients.register();
    let controller = Arc::new(
      CacheController::new(&config.cache, storage, Arc::clone(&network), clients.clone())?
        .with_network_timeout(Duration::from_secs(config.quotes.timeout_secs)),
    );

    Ok(Self {
      config,
      kv,
      bus,
      saved,
      clients,
      client,
      network,
      controller,
    })
  }

  pub async fn run(&mut self, command: Command) -> Result<()> {
    debug!(?command, "Running command");

    match command {
      Command::Quote {
        lang,
        save,
        favorite,
      } => self.quote(lang, save || favorite, favorite).await,
      Command::Save {
        text,
        author,
        lang,
        favorite,
      } => self.save(&text, author.as_deref(), lang, favorite),
      Command::List { favorites } => {
        self.list(favorites);
        Ok(())
      }
      Command::Favorite { id } => self.favorite(&id),
      Command::Delete { id } => self.delete(&id),
      Command::Clear => {
        let count = self.saved.quotes().len();
        self.saved.clear_all();
        println!("Removed {} saved quotes", count);
        Ok(())
      }
      Command::Share {
        id,
        platform,
        page_url,
      } => {
        let record = self.find(&id)?;
        let url = platform.share_url(&record.display_text(), &page_url)?;
        println!("{}: {}", platform.display_name(), url);
        Ok(())
      }
      Command::Install => {
        self.controller.install().await;
        println!(
          "Installed {} ({:?})",
          self.controller.bucket(),
          self.controller.state()
        );
        Ok(())
      }
      Command::Activate => {
        let deleted = self.controller.activate();
        println!(
          "Activated {}, removed {} old caches",
          self.controller.bucket(),
          deleted.len()
        );
        for name in deleted {
          println!("  - {}", name);
        }
        if let Some(version) = self.clients.controller_of(self.client.id()) {
          debug!(version = %version, clients = self.clients.count(), "Clients claimed");
        }
        Ok(())
      }
      Command::Sync { tag } => self.sync(tag).await,
      Command::Push { payload } => {
        self.background().handle_push(payload.as_deref());
        Ok(())
      }
      Command::Watch => self.watch().await,
    }
  }

  async fn quote(&mut self, language: Language, save: bool, favorite: bool) -> Result<()> {
    // Without a cache the controller stays unactivated and passes requests through
    if self.config.cache.enabled {
      self.controller.start().await;
    }

    let client = QuoteClient::new(Arc::clone(&self.controller), &self.config.quotes);
    let mut session = QuoteSession::new(client, language, self.config.quotes.max_retries);

    if session.fetch_with_retries().await.is_err() {
      let reason = session
        .error()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown error".to_string());
      return Err(eyre!(
        "Could not fetch a quote after {} attempts: {}",
        session.retry_count(),
        reason
      ));
    }
    let Some(fetched) = session.current() else {
      return Err(eyre!("No quote was fetched"));
    };

    let quote = &fetched.quote;
    match &quote.author {
      Some(author) => println!("\"{}\" - {}", quote.text, author),
      None => println!("\"{}\"", quote.text),
    }
    if fetched.source != CacheSource::Network {
      match fetched.cached_at {
        Some(at) => println!(
          "(offline, showing the copy cached {})",
          at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println!("(served from cache)"),
      }
    }

    if save {
      let record = self
        .saved
        .save_quote(&quote.text, quote.author.as_deref(), language, favorite);
      println!("Saved as {}", record.id);
    } else if self.saved.is_quote_favorited(&quote.text) {
      println!("★ already in your favorites");
    } else if self.saved.is_quote_saved(&quote.text) {
      println!("Already saved");
    }

    Ok(())
  }

  fn save(
    &mut self,
    text: &str,
    author: Option<&str>,
    language: Language,
    favorite: bool,
  ) -> Result<()> {
    if text.trim().is_empty() {
      return Err(eyre!("Quote text is empty"));
    }

    let already = self.saved.is_quote_saved(text);
    let record = self.saved.save_quote(text, author, language, favorite);
    if already {
      println!("Already saved as {}", record.id);
    } else {
      println!("Saved as {}", record.id);
    }
    Ok(())
  }

  fn list(&mut self, favorites_only: bool) {
    self.saved.sync_pending();

    let records = if favorites_only {
      self.saved.favorites()
    } else {
      self.saved.quotes()
    };

    if records.is_empty() {
      println!("No saved quotes");
      return;
    }
    for record in records {
      print_record(record);
    }
  }

  fn favorite(&mut self, id: &str) -> Result<()> {
    self.find(id)?;
    self.saved.toggle_favorite(id);

    let now = self.saved.find(id).is_some_and(|r| r.is_favorite);
    println!("{} {}", id, if now { "★ favorited" } else { "unfavorited" });
    Ok(())
  }

  fn delete(&mut self, id: &str) -> Result<()> {
    self.find(id)?;
    self.saved.delete_quote(id);
    println!("Deleted {}", id);
    Ok(())
  }

  fn find(&self, id: &str) -> Result<SavedRecord> {
    self
      .saved
      .find(id)
      .cloned()
      .ok_or_else(|| eyre!("No saved quote with id '{}'", id))
  }

  fn background(&self) -> BackgroundChannel {
    BackgroundChannel::new(
      self.config.background.clone(),
      Arc::clone(&self.network),
      self.clients.clone(),
      Box::new(TerminalNotifier),
    )
  }

  async fn sync(&mut self, tag: Option<String>) -> Result<()> {
    let tag = tag.unwrap_or_else(|| self.config.background.sync_tag.clone());
    let delivered = self.background().handle_sync(&tag).await?;
    info!(tag = %tag, delivered, "Sync handled");

    while let Some(message) = self.client.try_recv() {
      match message {
        ClientMessage::NewQuote(data) => println!("New quote: {}", data),
      }
    }
    Ok(())
  }

  async fn watch(&mut self) -> Result<()> {
    let watcher = spawn_watcher(
      Arc::clone(&self.kv),
      self.config.storage.key.clone(),
      self.bus.clone(),
      Duration::from_millis(self.config.storage.watch_interval_ms),
    );
    println!(
      "Watching {} saved quotes, press Ctrl-C to stop",
      self.saved.quotes().len()
    );

    loop {
      tokio::select! {
        changed = self.saved.next_change() => {
          if !changed {
            break;
          }
          println!("Library changed, {} saved quotes", self.saved.quotes().len());
          if let Some(latest) = self.saved.quotes().first() {
            print_record(latest);
          }
        }
        _ = tokio::signal::ctrl_c() => break,
      }
    }

    self.saved.unsubscribe();
    watcher.abort();
    Ok(())
  }
}

fn print_record(record: &SavedRecord) {
  let star = if record.is_favorite { "★" } else { " " };
  println!(
    "{} {}  [{}] {}",
    star,
    record.id,
    record.language,
    record.display_text()
  );
}

fn ensure_parent(path: &Path) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .map_err(|e| eyre!("Failed to create directory {}: {}", parent.display(), e))?;
  }
  Ok(())
}
