//! In-process key/value store.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::backend::KeyValueBackend;
use crate::error::Result;

/// Map-backed store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn clones_share_state() {
        let backend = MemoryBackend::new();
        let other = backend.clone();

        backend.set("b", "2").await.unwrap();
        backend.set("a", "1").await.unwrap();

        assert_eq!(other.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(other.list_keys().await.unwrap(), vec!["a", "b"]);

        other.remove("a").await.unwrap();
        other.remove("missing").await.unwrap();
        assert_eq!(backend.get("a").await.unwrap(), None);
    }
}
