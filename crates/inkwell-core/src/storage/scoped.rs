//! Browser-scoped fallback store: one file per key inside a scope directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::backend::KeyValueBackend;
use crate::error::Result;

const VALUE_SUFFIX: &str = ".json";
const TEMP_SUFFIX: &str = ".tmp";

/// Directory-backed store scoped to a single account or origin.
#[derive(Debug, Clone)]
pub struct ScopedBackend {
    root: PathBuf,
}

impl ScopedBackend {
    /// Open the scope directory, creating it when missing.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!("Opened scoped store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{VALUE_SUFFIX}", encode_key(key)))
    }
}

impl KeyValueBackend for ScopedBackend {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let target = self.value_path(key);
        let staging = self.root.join(format!("{}{TEMP_SUFFIX}", encode_key(key)));
        tokio::fs::write(&staging, value).await?;
        tokio::fs::rename(&staging, &target).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.value_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.value_path(key)).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(encoded) = name.strip_suffix(VALUE_SUFFIX) else {
                continue;
            };
            match decode_key(encoded) {
                Some(key) => keys.push(key),
                None => tracing::warn!("Skipping undecodable file name in scoped store: {name}"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Percent-encode the key so it maps to a single safe file name.
fn encode_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

fn decode_key(encoded: &str) -> Option<String> {
    urlencoding::decode(encoded).ok().map(|key| key.into_owned())
}
