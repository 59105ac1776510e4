//! Offline entry store over the selected key/value backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::keys::{cached_key, is_store_key, offline_key, Partition};
use crate::error::Result;
use crate::models::{
    EntryDraft, EntryPatch, EntryType, OfflineRecord, RemoteEntry, SyncAction, TempId,
};
use crate::storage::{BackendSelector, KeyValueBackend, Platform};
use crate::util::{next_local_timestamp, unix_millis_now};

/// Number of entries per type plus the overall total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCounts {
    pub by_type: BTreeMap<EntryType, usize>,
    pub total: usize,
}

impl EntryCounts {
    fn tally(records: &[OfflineRecord]) -> Self {
        let mut by_type: BTreeMap<EntryType, usize> =
            EntryType::ALL.into_iter().map(|kind| (kind, 0)).collect();
        for record in records {
            *by_type.entry(record.entry_type).or_default() += 1;
        }
        Self {
            by_type,
            total: records.len(),
        }
    }

    pub fn get(&self, entry_type: EntryType) -> usize {
        self.by_type.get(&entry_type).copied().unwrap_or(0)
    }
}

/// Result of confirming a replayed record after the remote call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// The record is now synced.
    Confirmed,
    /// The record changed while the remote call was in flight and stays unsynced.
    Superseded,
    /// The record is gone or was already synced.
    Missing,
}

/// Locally held entries split into an unsynced partition and a cached partition.
///
/// Mutations are serialized behind a store-wide write lock and reads share a
/// read lock, so a read never observes a half-applied mutation. Cloning the
/// store shares the backend and the lock.
#[derive(Debug, Clone)]
pub struct OfflineEntryStore {
    backend: Arc<BackendSelector>,
    lock: Arc<RwLock<()>>,
}

impl OfflineEntryStore {
    pub fn new(backend: Arc<BackendSelector>) -> Self {
        Self {
            backend,
            lock: Arc::new(RwLock::new(())),
        }
    }

    /// Store over a fresh in-memory backend (useful for testing)
    pub fn in_memory(platform: Platform) -> Self {
        Self::new(Arc::new(BackendSelector::in_memory(platform)))
    }

    pub fn platform(&self) -> Platform {
        self.backend.platform()
    }

    /// Persist a new unsynced create and return its temp id.
    pub async fn create_local(&self, draft: EntryDraft) -> Result<TempId> {
        let _guard = self.lock.write().await;
        let record = OfflineRecord::from_draft(draft, unix_millis_now());
        self.write_record(Partition::Unsynced, &record).await?;
        tracing::debug!("Created offline entry {}", record.temp_id);
        Ok(record.temp_id)
    }

    /// Replace the cached partition with `entries`.
    ///
    /// The previous generation is fully removed before the new one is written,
    /// all under the write lock so readers only see the old or the new snapshot.
    pub async fn cache_server_snapshot(&self, entries: Vec<RemoteEntry>) -> Result<()> {
        let _guard = self.lock.write().await;

        let stale: Vec<String> = self
            .backend
            .list_keys()
            .await?
            .into_iter()
            .filter(|key| Partition::Cached.contains(key))
            .collect();
        for key in &stale {
            self.backend.remove(key).await?;
        }

        let count = entries.len();
        for entry in entries {
            let record = OfflineRecord::from_remote(entry);
            self.write_record(Partition::Cached, &record).await?;
        }

        tracing::info!(
            "Replaced cached snapshot ({} removed, {} written)",
            stale.len(),
            count
        );
        Ok(())
    }

    /// Every visible entry from both partitions, most recent first.
    pub async fn list_all(&self) -> Result<Vec<OfflineRecord>> {
        let _guard = self.lock.read().await;
        self.merged_records().await
    }

    /// Records awaiting reconciliation, oldest mutation first.
    pub async fn list_unsynced(&self) -> Result<Vec<OfflineRecord>> {
        let _guard = self.lock.read().await;
        let mut pending: Vec<OfflineRecord> = self
            .load_partition(Partition::Unsynced)
            .await?
            .into_iter()
            .filter(OfflineRecord::is_pending)
            .collect();
        pending.sort_by(|a, b| {
            a.local_timestamp
                .cmp(&b.local_timestamp)
                .then_with(|| a.temp_id.cmp(&b.temp_id))
        });
        Ok(pending)
    }

    /// `list_all` restricted to `entry_type`, or everything when `None`.
    pub async fn list_by_type(&self, entry_type: Option<EntryType>) -> Result<Vec<OfflineRecord>> {
        let records = self.list_all().await?;
        Ok(match entry_type {
            Some(kind) => records
                .into_iter()
                .filter(|record| record.entry_type == kind)
                .collect(),
            None => records,
        })
    }

    /// Case-insensitive substring search over title and content.
    ///
    /// A blank query matches nothing.
    pub async fn search(&self, query: &str) -> Result<Vec<OfflineRecord>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|record| record.matches_query(&needle))
            .collect())
    }

    /// Unsynced-partition record by temp id.
    pub async fn get(&self, temp_id: TempId) -> Result<Option<OfflineRecord>> {
        let _guard = self.lock.read().await;
        self.read_record(Partition::Unsynced, &offline_key(temp_id))
            .await
    }

    pub async fn get_cached(&self, server_id: i64) -> Result<Option<OfflineRecord>> {
        let _guard = self.lock.read().await;
        self.read_record(Partition::Cached, &cached_key(server_id))
            .await
    }

    /// Flip the record to synced, attaching `server_id` when given.
    ///
    /// Missing or already synced records are left untouched.
    pub async fn mark_synced(&self, temp_id: TempId, server_id: Option<i64>) -> Result<()> {
        let _guard = self.lock.write().await;
        let Some(mut record) = self
            .read_record(Partition::Unsynced, &offline_key(temp_id))
            .await?
        else {
            tracing::debug!("mark_synced: no offline entry {temp_id}");
            return Ok(());
        };
        if record.synced {
            return Ok(());
        }

        record.synced = true;
        if server_id.is_some() {
            record.server_id = server_id;
        }
        self.write_record(Partition::Unsynced, &record).await
    }

    /// Merge `patch` into the record and refresh its local timestamp.
    ///
    /// No-op when the record is absent.
    pub async fn update_local(&self, temp_id: TempId, patch: EntryPatch) -> Result<()> {
        let _guard = self.lock.write().await;
        let Some(mut record) = self
            .read_record(Partition::Unsynced, &offline_key(temp_id))
            .await?
        else {
            tracing::debug!("update_local: no offline entry {temp_id}");
            return Ok(());
        };

        patch.apply(&mut record);
        record.local_timestamp = next_local_timestamp(record.local_timestamp);
        self.write_record(Partition::Unsynced, &record).await
    }

    /// Apply a user edit and queue it for reconciliation.
    ///
    /// Returns `false` when the record does not exist.
    pub async fn stage_edit(&self, temp_id: TempId, patch: EntryPatch) -> Result<bool> {
        let _guard = self.lock.write().await;
        let Some(mut record) = self
            .read_record(Partition::Unsynced, &offline_key(temp_id))
            .await?
        else {
            return Ok(false);
        };

        patch.apply(&mut record);
        record.synced = false;
        record.action = if record.server_id.is_some() {
            SyncAction::Update
        } else {
            SyncAction::Create
        };
        record.local_timestamp = next_local_timestamp(record.local_timestamp);
        self.write_record(Partition::Unsynced, &record).await?;
        Ok(true)
    }

    /// Queue a user delete.
    ///
    /// A record the server has never seen is discarded outright. Returns `false`
    /// when the record does not exist.
    pub async fn stage_delete(&self, temp_id: TempId) -> Result<bool> {
        let _guard = self.lock.write().await;
        let key = offline_key(temp_id);
        let Some(mut record) = self.read_record(Partition::Unsynced, &key).await? else {
            return Ok(false);
        };

        if record.server_id.is_none() {
            self.backend.remove(&key).await?;
            tracing::debug!("Discarded unsent offline entry {temp_id}");
            return Ok(true);
        }

        record.synced = false;
        record.action = SyncAction::Delete;
        record.local_timestamp = next_local_timestamp(record.local_timestamp);
        self.write_record(Partition::Unsynced, &record).await?;
        Ok(true)
    }

    /// Bring a cached record into the unsynced partition so it can be staged.
    ///
    /// Returns the temp id of the unsynced-partition record carrying
    /// `server_id`, or `None` when neither partition knows the entry.
    pub async fn adopt_cached(&self, server_id: i64) -> Result<Option<TempId>> {
        let _guard = self.lock.write().await;

        let existing = self
            .load_partition(Partition::Unsynced)
            .await?
            .into_iter()
            .find(|record| record.server_id == Some(server_id));
        if let Some(record) = existing {
            return Ok(Some(record.temp_id));
        }

        let Some(mut record) = self
            .read_record(Partition::Cached, &cached_key(server_id))
            .await?
        else {
            return Ok(None);
        };
        record.origin = Partition::Unsynced.origin();
        self.write_record(Partition::Unsynced, &record).await?;
        tracing::debug!("Adopted cached entry {server_id} as {}", record.temp_id);
        Ok(Some(record.temp_id))
    }

    /// Remove the record from the unsynced partition.
    pub async fn delete_local(&self, temp_id: TempId) -> Result<()> {
        let _guard = self.lock.write().await;
        self.backend.remove(&offline_key(temp_id)).await?;
        tracing::debug!("Deleted offline entry {temp_id}");
        Ok(())
    }

    /// Confirm a record the reconciler just replayed.
    ///
    /// The record is only marked synced when its local timestamp still matches
    /// `replayed`. Otherwise it was edited mid-flight: the server id is kept so
    /// the next run replays the edit as an update.
    pub async fn confirm_replay(
        &self,
        replayed: &OfflineRecord,
        server_id: Option<i64>,
    ) -> Result<ReplayOutcome> {
        let _guard = self.lock.write().await;
        let Some(mut current) = self
            .read_record(Partition::Unsynced, &offline_key(replayed.temp_id))
            .await?
        else {
            return Ok(ReplayOutcome::Missing);
        };
        if current.synced {
            return Ok(ReplayOutcome::Missing);
        }

        if server_id.is_some() {
            current.server_id = server_id;
        }

        let outcome = if current.local_timestamp == replayed.local_timestamp {
            current.synced = true;
            ReplayOutcome::Confirmed
        } else {
            if current.server_id.is_some() && current.action == SyncAction::Create {
                current.action = SyncAction::Update;
            }
            ReplayOutcome::Superseded
        };

        self.write_record(Partition::Unsynced, &current).await?;
        Ok(outcome)
    }

    /// Drop every local trace of an entry whose remote delete was confirmed.
    pub async fn discard_replayed(&self, temp_id: TempId, server_id: Option<i64>) -> Result<()> {
        let _guard = self.lock.write().await;
        self.backend.remove(&offline_key(temp_id)).await?;
        if let Some(server_id) = server_id {
            self.backend.remove(&cached_key(server_id)).await?;
        }
        Ok(())
    }

    /// Wipe both partitions and the reserved sync-queue key.
    ///
    /// Keys owned by other components on the same backend are kept.
    pub async fn clear_all(&self) -> Result<()> {
        let _guard = self.lock.write().await;
        let keys = self.backend.list_keys().await?;
        let mut removed = 0_usize;
        for key in keys.iter().filter(|key| is_store_key(key)) {
            self.backend.remove(key).await?;
            removed += 1;
        }
        tracing::info!("Cleared offline entry store ({removed} keys)");
        Ok(())
    }

    pub async fn counts_by_type(&self) -> Result<EntryCounts> {
        Ok(EntryCounts::tally(&self.list_all().await?))
    }

    /// Number of records awaiting reconciliation.
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.list_unsynced().await?.len())
    }

    /// Merge both partitions into the single read view.
    ///
    /// A pending unsynced-partition record shadows the cached record with the
    /// same server id. A synced one gives way to the cached record, which holds
    /// authoritative server state. Pending deletes are hidden.
    async fn merged_records(&self) -> Result<Vec<OfflineRecord>> {
        let (local, cached) = self.load_both_partitions().await?;
        let mut cached: HashMap<i64, OfflineRecord> = cached
            .into_iter()
            .filter_map(|record| record.server_id.map(|id| (id, record)))
            .collect();

        let mut merged = Vec::with_capacity(local.len() + cached.len());
        for record in local {
            if let Some(id) = record.server_id {
                if record.synced && cached.contains_key(&id) {
                    continue;
                }
                cached.remove(&id);
            }
            if !record.is_pending_delete() {
                merged.push(record);
            }
        }
        merged.extend(cached.into_values());

        merged.sort_by(|a, b| {
            b.local_timestamp
                .cmp(&a.local_timestamp)
                .then_with(|| b.temp_id.cmp(&a.temp_id))
        });
        Ok(merged)
    }

    async fn load_both_partitions(&self) -> Result<(Vec<OfflineRecord>, Vec<OfflineRecord>)> {
        let mut local = Vec::new();
        let mut cached = Vec::new();
        for key in self.backend.list_keys().await? {
            let Some(partition) = Partition::classify(&key) else {
                continue;
            };
            if let Some(record) = self.read_record(partition, &key).await? {
                match partition {
                    Partition::Unsynced => local.push(record),
                    Partition::Cached => cached.push(record),
                }
            }
        }
        Ok((local, cached))
    }

    async fn load_partition(&self, partition: Partition) -> Result<Vec<OfflineRecord>> {
        let mut records = Vec::new();
        for key in self.backend.list_keys().await? {
            if !partition.contains(&key) {
                continue;
            }
            if let Some(record) = self.read_record(partition, &key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Read and decode one record. Undecodable payloads are logged and skipped.
    async fn read_record(&self, partition: Partition, key: &str) -> Result<Option<OfflineRecord>> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<OfflineRecord>(&raw) {
            Ok(mut record) => {
                record.origin = partition.origin();
                Ok(Some(record))
            }
            Err(error) => {
                tracing::warn!("Skipping malformed stored entry {key}: {error}");
                Ok(None)
            }
        }
    }

    async fn write_record(&self, partition: Partition, record: &OfflineRecord) -> Result<()> {
        let key = match partition {
            Partition::Unsynced => offline_key(record.temp_id),
            Partition::Cached => match record.server_id {
                Some(server_id) => cached_key(server_id),
                None => {
                    return Err(crate::Error::InvalidInput(format!(
                        "Cached entry {} has no server id",
                        record.temp_id
                    )))
                }
            },
        };
        let payload = serde_json::to_string(record)?;
        self.backend.set(&key, &payload).await?;
        tracing::debug!("Wrote {key}");
        Ok(())
    }

    /// Write a record with caller-controlled fields, bypassing timestamp refresh.
    #[cfg(test)]
    pub(crate) async fn insert_record(&self, record: &OfflineRecord) -> Result<()> {
        let _guard = self.lock.write().await;
        let partition = match record.origin {
            crate::models::RecordOrigin::Unsynced => Partition::Unsynced,
            crate::models::RecordOrigin::Cached => Partition::Cached,
        };
        self.write_record(partition, record).await
    }

    #[cfg(test)]
    pub(crate) async fn raw_set(&self, key: &str, value: &str) -> Result<()> {
        self.backend.set(key, value).await
    }

    #[cfg(test)]
    pub(crate) async fn raw_keys(&self) -> Result<Vec<String>> {
        self.backend.list_keys().await
    }
}
