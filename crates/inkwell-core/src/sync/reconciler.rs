//! Replays unsynced records against the remote entry API.

use std::collections::HashSet;

use tokio::sync::Mutex;

use super::remote::{RemoteEntryApi, RemoteResult};
use crate::error::{Error, Result};
use crate::models::{EntryFields, OfflineRecord, SyncAction, TempId};
use crate::offline::{OfflineEntryStore, ReplayOutcome};
use crate::state::SyncState;

/// One record the remote API rejected during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub temp_id: TempId,
    pub action: SyncAction,
    pub message: String,
}

/// Summary of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records replayed this run.
    pub attempted: usize,
    /// Creates and updates confirmed and marked synced.
    pub synced: usize,
    /// Deletes confirmed and removed locally.
    pub deleted: usize,
    /// Records edited while their replay was in flight; picked up next run.
    pub deferred: usize,
    pub failures: Vec<SyncFailure>,
    /// Unsynced records left after the run.
    pub pending: usize,
}

impl SyncReport {
    pub const fn state(&self) -> SyncState {
        SyncState::from_pending(self.pending)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.pending == 0
    }
}

enum Replayed {
    /// Create or update accepted, with the server id when one was assigned.
    Written(Option<i64>),
    /// Delete accepted, or nothing to delete remotely.
    Deleted,
}

/// Drives the unsynced partition towards the remote store.
///
/// Runs are serialized; a run that starts while another is active waits for it.
/// Local writes landing during a run are picked up by the next one.
pub struct SyncReconciler<A> {
    store: OfflineEntryStore,
    api: A,
    run_guard: Mutex<()>,
}

impl<A: RemoteEntryApi> SyncReconciler<A> {
    pub fn new(store: OfflineEntryStore, api: A) -> Self {
        Self {
            store,
            api,
            run_guard: Mutex::new(()),
        }
    }

    pub const fn store(&self) -> &OfflineEntryStore {
        &self.store
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Replay every unsynced record, oldest mutation first.
    ///
    /// Remote failures are collected into the report and never abort the batch.
    /// Only local storage failures are returned as errors.
    pub async fn reconcile(&self) -> Result<SyncReport> {
        let _run = self.run_guard.lock().await;
        let queue = self.store.list_unsynced().await?;
        let mut report = SyncReport::default();

        for record in queue {
            report.attempted += 1;
            match self.replay(&record).await {
                Ok(Replayed::Written(server_id)) => {
                    match self.store.confirm_replay(&record, server_id).await? {
                        ReplayOutcome::Confirmed => report.synced += 1,
                        ReplayOutcome::Superseded => report.deferred += 1,
                        ReplayOutcome::Missing => {
                            tracing::debug!("Entry {} vanished during replay", record.temp_id);
                        }
                    }
                }
                Ok(Replayed::Deleted) => {
                    self.store
                        .discard_replayed(record.temp_id, record.server_id)
                        .await?;
                    report.deleted += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        "Failed to sync {} of entry {}: {error}",
                        record.action,
                        record.temp_id
                    );
                    report.failures.push(SyncFailure {
                        temp_id: record.temp_id,
                        action: record.action,
                        message: error.to_string(),
                    });
                }
            }
        }

        report.pending = self.store.pending_count().await?;
        tracing::info!(
            "Sync run finished: {} attempted, {} synced, {} deleted, {} failed, {} pending",
            report.attempted,
            report.synced,
            report.deleted,
            report.failures.len(),
            report.pending
        );
        Ok(report)
    }

    async fn replay(&self, record: &OfflineRecord) -> RemoteResult<Replayed> {
        match (record.action, record.server_id) {
            (SyncAction::Delete, Some(id)) => match self.api.delete(id).await {
                Ok(()) => Ok(Replayed::Deleted),
                Err(error) if error.is_not_found() => {
                    tracing::debug!("Entry {id} was already deleted remotely");
                    Ok(Replayed::Deleted)
                }
                Err(error) => Err(error),
            },
            (SyncAction::Delete, None) => Ok(Replayed::Deleted),
            (SyncAction::Create | SyncAction::Update, Some(id)) => {
                self.api.update(id, &EntryFields::from(record)).await?;
                Ok(Replayed::Written(None))
            }
            (SyncAction::Create | SyncAction::Update, None) => {
                let id = self.api.create(&EntryFields::from(record)).await?;
                Ok(Replayed::Written(Some(id)))
            }
        }
    }

    /// Rebuild the cached partition from the full remote listing.
    ///
    /// Pages through the listing until a short page, or a full page that adds
    /// no unseen ids, and returns the number of cached entries.
    pub async fn refresh_cache(&self, page_size: usize) -> Result<usize> {
        if page_size == 0 {
            return Err(Error::InvalidInput("page size must be positive".into()));
        }

        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = 0;
        loop {
            let page = self.api.list(None, page_size, offset).await?;
            let fetched = page.len();
            let before = entries.len();
            entries.extend(page.into_iter().filter(|entry| seen.insert(entry.id)));
            if fetched < page_size || entries.len() == before {
                break;
            }
            offset += fetched;
        }

        let count = entries.len();
        self.store.cache_server_snapshot(entries).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::models::{EntryDraft, EntryPatch, EntryType, RemoteEntry};
    use crate::offline::test_support::{cached_record, remote_entry};
    use crate::storage::Platform;
    use crate::sync::RemoteError;
    use pretty_assertions::assert_eq;

    /// In-memory remote with per-title failure injection and a call log.
    #[derive(Default)]
    struct ScriptedApi {
        entries: StdMutex<BTreeMap<i64, RemoteEntry>>,
        failing_titles: StdMutex<HashSet<String>>,
        missing_ids: StdMutex<HashSet<i64>>,
        calls: StdMutex<Vec<String>>,
        mid_flight_edit: StdMutex<Option<(OfflineEntryStore, TempId)>>,
    }

    impl ScriptedApi {
        fn fail_title(&self, title: &str) {
            self.failing_titles.lock().unwrap().insert(title.to_string());
        }

        fn heal(&self) {
            self.failing_titles.lock().unwrap().clear();
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn seed(&self, entry: RemoteEntry) {
            self.entries.lock().unwrap().insert(entry.id, entry);
        }

        fn check(&self, call: String, title: Option<&str>) -> RemoteResult<()> {
            self.calls.lock().unwrap().push(call);
            if title.is_some_and(|title| self.failing_titles.lock().unwrap().contains(title)) {
                return Err(RemoteError::Api {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            Ok(())
        }
    }

    impl RemoteEntryApi for ScriptedApi {
        async fn create(&self, fields: &EntryFields) -> RemoteResult<i64> {
            self.check(format!("create:{}", fields.title), Some(&fields.title))?;
            let pending_edit = self.mid_flight_edit.lock().unwrap().take();
            if let Some((store, temp_id)) = pending_edit {
                store
                    .update_local(
                        temp_id,
                        EntryPatch {
                            content: Some("edited while syncing".into()),
                            ..EntryPatch::default()
                        },
                    )
                    .await
                    .unwrap();
            }
            let mut entries = self.entries.lock().unwrap();
            let id = entries.keys().next_back().copied().unwrap_or(100) + 1;
            entries.insert(id, remote_entry(id, &fields.title, 0));
            Ok(id)
        }

        async fn update(&self, id: i64, fields: &EntryFields) -> RemoteResult<()> {
            self.check(format!("update:{id}"), Some(&fields.title))?;
            if let Some(entry) = self.entries.lock().unwrap().get_mut(&id) {
                entry.title.clone_from(&fields.title);
            }
            Ok(())
        }

        async fn delete(&self, id: i64) -> RemoteResult<()> {
            self.check(format!("delete:{id}"), None)?;
            if self.missing_ids.lock().unwrap().contains(&id) {
                return Err(RemoteError::Api {
                    status: 404,
                    message: "gone".into(),
                });
            }
            self.entries.lock().unwrap().remove(&id);
            Ok(())
        }

        async fn list(
            &self,
            _entry_type: Option<EntryType>,
            limit: usize,
            offset: usize,
        ) -> RemoteResult<Vec<RemoteEntry>> {
            self.check(format!("list:{offset}"), None)?;
            Ok(self
                .entries
                .lock()
                .unwrap()
                .values()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn search(&self, query: &str) -> RemoteResult<Vec<RemoteEntry>> {
            self.check(format!("search:{query}"), None)?;
            Ok(Vec::new())
        }
    }

    fn reconciler() -> SyncReconciler<std::sync::Arc<ScriptedApi>> {
        SyncReconciler::new(
            OfflineEntryStore::in_memory(Platform::Native),
            std::sync::Arc::new(ScriptedApi::default()),
        )
    }

    fn draft(title: &str) -> EntryDraft {
        EntryDraft::new(title, "body", EntryType::Journal)
    }

    #[tokio::test]
    async fn failed_create_is_retried_on_next_run() {
        let sync = reconciler();
        let t1 = sync.store().create_local(draft("A")).await.unwrap();
        sync.api().fail_title("A");

        let first = sync.reconcile().await.unwrap();
        assert_eq!(first.failures.len(), 1);
        assert_eq!(first.failures[0].temp_id, t1);
        assert_eq!(first.pending, 1);
        assert_eq!(first.state(), SyncState::Pending);
        assert!(!sync.store().get(t1).await.unwrap().unwrap().synced);

        sync.api().heal();
        let second = sync.reconcile().await.unwrap();
        let record = sync.store().get(t1).await.unwrap().unwrap();
        assert_eq!(second.synced, 1);
        assert!(record.synced);
        assert_eq!(record.server_id, Some(101));
        assert_eq!(second.state(), SyncState::Synced);

        let third = sync.reconcile().await.unwrap();
        assert_eq!(third, SyncReport::default());
        assert_eq!(sync.api().calls(), vec!["create:A", "create:A"]);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_batch() {
        let sync = reconciler();
        sync.store().create_local(draft("first")).await.unwrap();
        sync.store().create_local(draft("broken")).await.unwrap();
        sync.store().create_local(draft("last")).await.unwrap();
        sync.api().fail_title("broken");

        let report = sync.reconcile().await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.synced, 2);
        assert_eq!(report.pending, 1);
        assert!(!report.is_clean());
        assert_eq!(
            sync.api().calls(),
            vec!["create:first", "create:broken", "create:last"]
        );
    }

    #[tokio::test]
    async fn actions_map_to_remote_operations() {
        let sync = reconciler();
        let store = sync.store();
        sync.api().seed(remote_entry(7, "seven", 10));
        sync.api().seed(remote_entry(8, "eight", 10));
        store
            .cache_server_snapshot(vec![
                remote_entry(7, "seven", 10),
                remote_entry(8, "eight", 10),
            ])
            .await
            .unwrap();

        let edit = store.adopt_cached(7).await.unwrap().unwrap();
        store
            .stage_edit(
                edit,
                EntryPatch {
                    title: Some("seven!".into()),
                    ..EntryPatch::default()
                },
            )
            .await
            .unwrap();
        let doomed = store.adopt_cached(8).await.unwrap().unwrap();
        store.stage_delete(doomed).await.unwrap();

        let report = sync.reconcile().await.unwrap();

        let mut calls = sync.api().calls();
        calls.sort();
        assert_eq!(report.synced, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(calls, vec!["delete:8", "update:7"]);
        assert_eq!(store.get(doomed).await.unwrap(), None);
        assert_eq!(store.get_cached(8).await.unwrap(), None);
        assert!(store.get(edit).await.unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn update_without_server_id_is_sent_as_create() {
        let sync = reconciler();
        let mut record = crate::offline::test_support::pending_record("orphan", 5);
        record.action = SyncAction::Update;
        sync.store().insert_record(&record).await.unwrap();

        sync.reconcile().await.unwrap();

        assert_eq!(sync.api().calls(), vec!["create:orphan"]);
        let stored = sync.store().get(record.temp_id).await.unwrap().unwrap();
        assert!(stored.synced);
        assert!(stored.server_id.is_some());
    }

    #[tokio::test]
    async fn delete_already_gone_remotely_counts_as_confirmed() {
        let sync = reconciler();
        let mut record = cached_record(9, "nine", 10);
        record.origin = crate::models::RecordOrigin::Unsynced;
        record.synced = false;
        record.action = SyncAction::Delete;
        sync.store().insert_record(&record).await.unwrap();
        sync.api().missing_ids.lock().unwrap().insert(9);

        let report = sync.reconcile().await.unwrap();

        assert_eq!(report.deleted, 1);
        assert!(report.failures.is_empty());
        assert_eq!(sync.store().get(record.temp_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn edit_during_replay_is_deferred_then_sent_as_update() {
        let sync = reconciler();
        let temp_id = sync.store().create_local(draft("racy")).await.unwrap();
        *sync.api().mid_flight_edit.lock().unwrap() = Some((sync.store().clone(), temp_id));

        let first = sync.reconcile().await.unwrap();
        assert_eq!(first.deferred, 1);
        assert_eq!(first.pending, 1);
        let record = sync.store().get(temp_id).await.unwrap().unwrap();
        assert_eq!(record.action, SyncAction::Update);
        assert_eq!(record.server_id, Some(101));

        let second = sync.reconcile().await.unwrap();
        assert_eq!(second.synced, 1);
        assert_eq!(sync.api().calls(), vec!["create:racy", "update:101"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn overlapping_runs_do_not_double_send() {
        let sync = reconciler();
        sync.store().create_local(draft("once")).await.unwrap();

        let (a, b) = tokio::join!(sync.reconcile(), sync.reconcile());
        let total_synced = a.unwrap().synced + b.unwrap().synced;

        assert_eq!(total_synced, 1);
        assert_eq!(sync.api().calls(), vec!["create:once"]);
    }

    #[tokio::test]
    async fn refresh_cache_pages_until_short_page() {
        let sync = reconciler();
        for id in 1..=5 {
            sync.api().seed(remote_entry(id, &format!("e{id}"), id * 10));
        }
        sync.store()
            .cache_server_snapshot(vec![remote_entry(99, "stale", 1)])
            .await
            .unwrap();

        let count = sync.refresh_cache(2).await.unwrap();

        assert_eq!(count, 5);
        assert_eq!(sync.api().calls(), vec!["list:0", "list:2", "list:4"]);
        assert_eq!(sync.store().get_cached(99).await.unwrap(), None);
        assert_eq!(sync.store().list_all().await.unwrap().len(), 5);
        assert!(sync.refresh_cache(0).await.is_err());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_snapshot() {
        let store = OfflineEntryStore::in_memory(Platform::Native);
        store
            .cache_server_snapshot(vec![remote_entry(1, "kept", 1)])
            .await
            .unwrap();

        let sync = SyncReconciler::new(store.clone(), FailingList);
        assert!(matches!(
            sync.refresh_cache(10).await,
            Err(Error::Remote(_))
        ));
        assert!(store.get_cached(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn refresh_stops_when_listing_repeats_itself() {
        let sync = SyncReconciler::new(
            OfflineEntryStore::in_memory(Platform::Native),
            RepeatingList,
        );

        let refresh = sync.refresh_cache(2);
        let count = tokio::time::timeout(std::time::Duration::from_secs(3), refresh)
            .await
            .expect("refresh_cache must terminate")
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(sync.store().list_all().await.unwrap().len(), 2);
    }

    /// Ignores `offset` and hands back the same full page forever.
    struct RepeatingList;

    impl RemoteEntryApi for RepeatingList {
        async fn create(&self, _fields: &EntryFields) -> RemoteResult<i64> {
            Err(RemoteError::InvalidPayload("unused".into()))
        }

        async fn update(&self, _id: i64, _fields: &EntryFields) -> RemoteResult<()> {
            Ok(())
        }

        async fn delete(&self, _id: i64) -> RemoteResult<()> {
            Ok(())
        }

        async fn list(
            &self,
            _entry_type: Option<EntryType>,
            limit: usize,
            _offset: usize,
        ) -> RemoteResult<Vec<RemoteEntry>> {
            Ok((1..=i64::try_from(limit).unwrap())
                .map(|id| remote_entry(id, "again", 10))
                .collect())
        }

        async fn search(&self, _query: &str) -> RemoteResult<Vec<RemoteEntry>> {
            Ok(Vec::new())
        }
    }

    struct FailingList;

    impl RemoteEntryApi for FailingList {
        async fn create(&self, _fields: &EntryFields) -> RemoteResult<i64> {
            Err(RemoteError::InvalidPayload("unused".into()))
        }

        async fn update(&self, _id: i64, _fields: &EntryFields) -> RemoteResult<()> {
            Ok(())
        }

        async fn delete(&self, _id: i64) -> RemoteResult<()> {
            Ok(())
        }

        async fn list(
            &self,
            _entry_type: Option<EntryType>,
            _limit: usize,
            _offset: usize,
        ) -> RemoteResult<Vec<RemoteEntry>> {
            Err(RemoteError::Api {
                status: 500,
                message: "down".into(),
            })
        }

        async fn search(&self, _query: &str) -> RemoteResult<Vec<RemoteEntry>> {
            Ok(Vec::new())
        }
    }
}
