//! Offline-first response cache.
//!
//! This module intercepts the application's outgoing requests:
//! - Keeps a single versioned bucket of responses; bumping the version is
//!   the only way to invalidate it
//! - Precaches the static asset manifest on install
//! - Serves the quote API network-first and everything else cache-first
//! - Falls back to a cached shell document for offline page loads

mod controller;
mod storage;
mod traits;

pub use controller::{CacheController, LifecycleState};
pub use storage::{CacheStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, RequestKey};
