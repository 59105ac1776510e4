//! Uniform async key/value contract shared by every storage backend.

use crate::error::Result;

use super::memory::MemoryBackend;
use super::preferences::PreferencesBackend;
use super::scoped::ScopedBackend;

/// Async key/value storage.
///
/// Backend failures propagate to the caller as-is. Implementations never retry
/// and never swallow errors.
#[allow(async_fn_in_trait)]
pub trait KeyValueBackend {
    /// Insert or overwrite `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Read `key`, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Every key currently stored, sorted.
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// The concrete backend picked for this process.
#[derive(Debug)]
pub enum StorageBackend {
    /// Native platform preference store.
    Preferences(PreferencesBackend),
    /// Browser-scoped fallback store.
    Scoped(ScopedBackend),
    /// In-process store for tests and ephemeral sessions.
    Memory(MemoryBackend),
}

impl StorageBackend {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Preferences(_) => "preferences",
            Self::Scoped(_) => "scoped",
            Self::Memory(_) => "memory",
        }
    }
}

impl KeyValueBackend for StorageBackend {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Self::Preferences(backend) => backend.set(key, value).await,
            Self::Scoped(backend) => backend.set(key, value).await,
            Self::Memory(backend) => backend.set(key, value).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::Preferences(backend) => backend.get(key).await,
            Self::Scoped(backend) => backend.get(key).await,
            Self::Memory(backend) => backend.get(key).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match self {
            Self::Preferences(backend) => backend.remove(key).await,
            Self::Scoped(backend) => backend.remove(key).await,
            Self::Memory(backend) => backend.remove(key).await,
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        match self {
            Self::Preferences(backend) => backend.list_keys().await,
            Self::Scoped(backend) => backend.list_keys().await,
            Self::Memory(backend) => backend.list_keys().await,
        }
    }
}
