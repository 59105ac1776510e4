//! Persistent key/value storage and platform backend selection.

mod backend;
mod memory;
mod preferences;
mod scoped;
mod selector;

pub use backend::{KeyValueBackend, StorageBackend};
pub use memory::MemoryBackend;
pub use preferences::PreferencesBackend;
pub use scoped::ScopedBackend;
pub use selector::{
    BackendSelector, Platform, StorageOptions, DEFAULT_SCOPE, PREFERENCES_FILE, SCOPED_DIR,
};
