use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::records::{Language, STORAGE_KEY};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub storage: StorageConfig,
  pub cache: CacheConfig,
  pub quotes: QuotesConfig,
  pub background: BackgroundConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  /// Maximum number of saved quotes kept on disk
  pub max_records: usize,
  /// Durable key the saved quotes live under
  pub key: String,
  /// Byte quota shared by all stored values (localStorage-sized by default)
  pub quota_bytes: usize,
  /// Override for the record database path
  pub path: Option<PathBuf>,
  /// How often to check for writes made by other processes, in milliseconds
  pub watch_interval_ms: u64,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      max_records: 100,
      key: STORAGE_KEY.to_string(),
      quota_bytes: 5 * 1024 * 1024,
      path: None,
      watch_interval_ms: 500,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Set to false to disable response caching entirely
  pub enabled: bool,
  pub name_prefix: String,
  pub version: String,
  /// Origin that relative manifest entries resolve against
  pub origin: String,
  /// Static assets warmed on install
  pub manifest: Vec<String>,
  /// URL fragments identifying the remote quote API (network-first)
  pub api_patterns: Vec<String>,
  /// Document served when a navigation can't be satisfied at all
  pub offline_fallback: String,
  /// Override for the cache database path
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      name_prefix: "wisdom-whispers".to_string(),
      version: "v1".to_string(),
      origin: "http://localhost:3000".to_string(),
      manifest: [
        "/",
        "/index.html",
        "/static/js/bundle.js",
        "/static/css/main.css",
        "/manifest.json",
        "/icon-192.png",
        "/icon-512.png",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
      api_patterns: vec![
        "random-quote.hyobb.com".to_string(),
        "/api/quote".to_string(),
        "random-quotes-freeapi.vercel.app".to_string(),
      ],
      offline_fallback: "/index.html".to_string(),
      path: None,
    }
  }
}

impl CacheConfig {
  /// Name of the live cache bucket, e.g. `wisdom-whispers-v1`.
  pub fn bucket_name(&self) -> String {
    format!("{}-{}", self.name_prefix, self.version)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
  pub endpoints: QuoteEndpoints,
  pub timeout_secs: u64,
  pub max_retries: u32,
}

impl Default for QuotesConfig {
  fn default() -> Self {
    Self {
      endpoints: QuoteEndpoints::default(),
      timeout_secs: 5,
      max_retries: 3,
    }
  }
}

/// One endpoint per language; all of them speak the same response contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuoteEndpoints {
  pub en: String,
  pub ko: String,
}

impl Default for QuoteEndpoints {
  fn default() -> Self {
    Self {
      en: "https://random-quotes-freeapi.vercel.app/api/random".to_string(),
      ko: "http://localhost:3000/api/quote".to_string(),
    }
  }
}

impl QuoteEndpoints {
  pub fn for_language(&self, language: Language) -> &str {
    match language {
      Language::En => &self.en,
      Language::Ko => &self.ko,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
  /// Sync tag that triggers a quote refresh
  pub sync_tag: String,
  pub sync_url: String,
  pub notification_title: String,
  pub default_push_body: String,
  pub icon: String,
}

impl Default for BackgroundConfig {
  fn default() -> Self {
    Self {
      sync_tag: "get-new-quote".to_string(),
      sync_url: "https://random-quote.hyobb.com/".to_string(),
      notification_title: "Wisdom Whispers".to_string(),
      default_push_body: "New inspirational quote available!".to_string(),
      icon: "/icon-192.png".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./whispers.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/whispers/config.yaml
  ///
  /// Without any file the built-in defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("whispers.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("whispers").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if config.storage.max_records == 0 {
      return Err(eyre!("storage.max_records must be at least 1"));
    }

    Ok(config)
  }

  /// Directory that holds the databases and log files.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("whispers"))
  }

  pub fn store_path(&self) -> Result<PathBuf> {
    match &self.storage.path {
      Some(p) => Ok(p.clone()),
      None => Ok(Self::data_dir()?.join("store.db")),
    }
  }

  pub fn cache_path(&self) -> Result<PathBuf> {
    match &self.cache.path {
      Some(p) => Ok(p.clone()),
      None => Ok(Self::data_dir()?.join("cache.db")),
    }
  }
}
