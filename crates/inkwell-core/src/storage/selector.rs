//! Platform detection and one-time backend selection.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use super::backend::{KeyValueBackend, StorageBackend};
use super::memory::MemoryBackend;
use super::preferences::PreferencesBackend;
use super::scoped::ScopedBackend;
use crate::error::{Error, Result};

/// File name of the native preference store inside the data directory.
pub const PREFERENCES_FILE: &str = "preferences.db";
/// Directory holding browser-scoped stores inside the data directory.
pub const SCOPED_DIR: &str = "scoped";
pub const DEFAULT_SCOPE: &str = "default";

/// Capability reported by the host: does it offer a native preference store?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Native,
    Browser,
}

impl Platform {
    /// Detect the platform from the compilation target.
    pub const fn detect() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Browser
        } else {
            Self::Native
        }
    }

    pub const fn is_native(self) -> bool {
        matches!(self, Self::Native)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "browser" | "web" => Ok(Self::Browser),
            other => Err(Error::Config(format!("Unknown platform: {other}"))),
        }
    }
}

/// Where the selected backend keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
    pub data_dir: PathBuf,
    pub scope: String,
    /// Keep everything in memory for the lifetime of the process.
    pub ephemeral: bool,
}

impl StorageOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            scope: DEFAULT_SCOPE.to_string(),
            ephemeral: false,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub const fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

/// Lazily opens the backend for `platform` on first access and reuses it afterwards.
///
/// A failed open is not memoized; the next access tries again.
#[derive(Debug)]
pub struct BackendSelector {
    platform: Platform,
    options: Option<StorageOptions>,
    backend: OnceCell<StorageBackend>,
}

impl BackendSelector {
    pub fn new(platform: Platform, options: StorageOptions) -> Self {
        Self {
            platform,
            options: Some(options),
            backend: OnceCell::new(),
        }
    }

    /// Selector with an already opened backend.
    pub fn with_backend(platform: Platform, backend: StorageBackend) -> Self {
        Self {
            platform,
            options: None,
            backend: OnceCell::new_with(Some(backend)),
        }
    }

    /// Selector over a fresh in-memory backend (useful for testing)
    pub fn in_memory(platform: Platform) -> Self {
        Self::with_backend(platform, StorageBackend::Memory(MemoryBackend::new()))
    }

    pub const fn platform(&self) -> Platform {
        self.platform
    }

    pub fn is_selected(&self) -> bool {
        self.backend.initialized()
    }

    /// The selected backend, opening it on first use.
    pub async fn backend(&self) -> Result<&StorageBackend> {
        self.backend.get_or_try_init(|| self.open()).await
    }

    async fn open(&self) -> Result<StorageBackend> {
        let options = self
            .options
            .as_ref()
            .ok_or_else(|| Error::Storage("No storage options configured".into()))?;

        let backend = if options.ephemeral {
            StorageBackend::Memory(MemoryBackend::new())
        } else {
            match self.platform {
                Platform::Native => StorageBackend::Preferences(
                    PreferencesBackend::open(options.data_dir.join(PREFERENCES_FILE)).await?,
                ),
                Platform::Browser => StorageBackend::Scoped(
                    ScopedBackend::open(options.data_dir.join(SCOPED_DIR).join(&options.scope))
                        .await?,
                ),
            }
        };

        tracing::info!(
            "Selected {} storage backend for {} platform",
            backend.name(),
            self.platform
        );
        Ok(backend)
    }
}

impl KeyValueBackend for BackendSelector {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.backend().await?.set(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.backend().await?.get(key).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.backend().await?.remove(key).await
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        self.backend().await?.list_keys().await
    }
}
