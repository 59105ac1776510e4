//! Sources a paginated view can read from.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::{EntryType, OfflineRecord, RemoteEntry};
use crate::offline::OfflineEntryStore;
use crate::sync::RemoteEntryApi;
use crate::util::normalize_text_option;

/// Batch size used when a remote listing must be read in full.
const REMOTE_BATCH_SIZE: usize = 100;

/// Active type and search filter of a view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub entry_type: Option<EntryType>,
    /// Trimmed search text, `None` when not searching.
    pub query: Option<String>,
}

impl ViewFilter {
    pub fn new(entry_type: Option<EntryType>, query: Option<String>) -> Self {
        Self {
            entry_type,
            query: normalize_text_option(query),
        }
    }

    #[must_use]
    pub const fn with_type(mut self, entry_type: Option<EntryType>) -> Self {
        self.entry_type = entry_type;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = normalize_text_option(Some(query.into()));
        self
    }

    fn admits(&self, entry_type: EntryType) -> bool {
        !matches!(self.entry_type, Some(kind) if kind != entry_type)
    }
}

/// Something a view can de-duplicate.
pub trait ViewItem {
    /// Stable identity: the server id when known, else the temp id.
    fn view_key(&self) -> String;
}

impl ViewItem for OfflineRecord {
    fn view_key(&self) -> String {
        match self.server_id {
            Some(id) => format!("server:{id}"),
            None => format!("temp:{}", self.temp_id),
        }
    }
}

impl ViewItem for RemoteEntry {
    fn view_key(&self) -> String {
        format!("server:{}", self.id)
    }
}

/// Paged entry listing. `limit: None` asks for everything from `offset` on.
#[allow(async_fn_in_trait)]
pub trait EntrySource {
    type Item: ViewItem + Clone;

    async fn fetch(
        &self,
        filter: &ViewFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Self::Item>>;
}

fn window<T>(items: Vec<T>, limit: Option<usize>, offset: usize) -> Vec<T> {
    items
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Cache-aware reads from the local store.
impl EntrySource for OfflineEntryStore {
    type Item = OfflineRecord;

    async fn fetch(
        &self,
        filter: &ViewFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<OfflineRecord>> {
        let records = match &filter.query {
            Some(query) => self
                .search(query)
                .await?
                .into_iter()
                .filter(|record| filter.admits(record.entry_type))
                .collect(),
            None => self.list_by_type(filter.entry_type).await?,
        };
        Ok(window(records, limit, offset))
    }
}

/// Live listing straight from the remote entry API.
#[derive(Debug, Clone)]
pub struct RemoteSource<A> {
    api: A,
}

impl<A: RemoteEntryApi> RemoteSource<A> {
    pub const fn new(api: A) -> Self {
        Self { api }
    }

    async fn list_everything(
        &self,
        entry_type: Option<EntryType>,
        mut offset: usize,
    ) -> Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        loop {
            let page = self.api.list(entry_type, REMOTE_BATCH_SIZE, offset).await?;
            let fetched = page.len();
            let before = entries.len();
            entries.extend(page.into_iter().filter(|entry| seen.insert(entry.id)));
            // A full page of already-seen ids means the server ignored the offset.
            if fetched < REMOTE_BATCH_SIZE || entries.len() == before {
                return Ok(entries);
            }
            offset += fetched;
        }
    }
}

impl<A: RemoteEntryApi> EntrySource for RemoteSource<A> {
    type Item = RemoteEntry;

    async fn fetch(
        &self,
        filter: &ViewFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RemoteEntry>> {
        if let Some(query) = &filter.query {
            let found: Vec<RemoteEntry> = self
                .api
                .search(query)
                .await?
                .into_iter()
                .filter(|entry| filter.admits(entry.entry_type))
                .collect();
            return Ok(window(found, limit, offset));
        }

        match limit {
            Some(limit) => Ok(self.api.list(filter.entry_type, limit, offset).await?),
            None => self.list_everything(filter.entry_type, offset).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryDraft, EntryFields};
    use crate::offline::test_support::remote_entry;
    use crate::storage::Platform;
    use crate::sync::RemoteResult;
    use pretty_assertions::assert_eq;

    /// Remote listing that ignores `offset` and always returns the same full batch.
    struct OffsetBlindApi;

    impl RemoteEntryApi for OffsetBlindApi {
        async fn create(&self, _fields: &EntryFields) -> RemoteResult<i64> {
            Ok(1)
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
                .map(|id| remote_entry(id, "same", 10))
                .collect())
        }

        async fn search(&self, _query: &str) -> RemoteResult<Vec<RemoteEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn remote_source_stops_on_repeated_full_page() {
        let source = RemoteSource::new(OffsetBlindApi);

        let everything = tokio::time::timeout(
            std::time::Duration::from_secs(3),
            source.fetch(&ViewFilter::default(), None, 0),
        )
        .await
        .expect("unbounded remote fetch must terminate")
        .unwrap();

        assert_eq!(everything.len(), REMOTE_BATCH_SIZE);
    }

    #[test]
    fn filter_normalizes_blank_query() {
        assert_eq!(ViewFilter::new(None, Some("   ".into())).query, None);
        assert_eq!(
            ViewFilter::default().with_query(" tea ").query.as_deref(),
            Some("tea")
        );
    }

    #[test]
    fn view_key_prefers_server_id() {
        let mut record =
            OfflineRecord::from_draft(EntryDraft::new("a", "", EntryType::Note), 1);
        assert!(record.view_key().starts_with("temp:"));
        record.server_id = Some(4);
        assert_eq!(record.view_key(), "server:4");
    }

    #[tokio::test]
    async fn store_source_applies_type_and_query() {
        let store = OfflineEntryStore::in_memory(Platform::Native);
        for (title, kind) in [
            ("Tea with Sam", EntryType::Person),
            ("Tea shop", EntryType::Place),
            ("Coffee", EntryType::Place),
        ] {
            store
                .create_local(EntryDraft::new(title, "", kind))
                .await
                .unwrap();
        }

        let place_filter = ViewFilter::default().with_type(Some(EntryType::Place));
        let places = store
            .fetch(&place_filter, None, 0)
            .await
            .unwrap();
        assert_eq!(places.len(), 2);

        let tea_places = store
            .fetch(
                &ViewFilter::new(Some(EntryType::Place), Some("tea".into())),
                None,
                0,
            )
            .await
            .unwrap();
        assert_eq!(tea_places.len(), 1);
        assert_eq!(tea_places[0].title, "Tea shop");

        let windowed = store
            .fetch(&ViewFilter::default(), Some(2), 2)
            .await
            .unwrap();
        assert_eq!(windowed.len(), 1);
    }
}
