//! Local library of saved quotes.
//!
//! - `backend`: durable key-value storage with a byte quota
//! - `store`: bounded, deduplicating record store on top of a backend
//! - `signal`: storage-change broadcast between contexts
//! - `coordinator`: in-memory read model that reloads on changes

mod backend;
mod coordinator;
mod signal;
mod store;
mod types;

pub use backend::{KeyValueStore, SqliteKv};
pub use coordinator::SavedQuotes;
pub use signal::{spawn_watcher, StorageBus};
pub use store::RecordStore;
pub use types::{Language, SavedRecord};

/// Durable key the saved quotes are stored under.
pub const STORAGE_KEY: &str = "wisdom_whispers_saved_quotes";
