//! Accumulating view state machine.

use std::collections::HashSet;

use tokio::sync::Mutex;

use super::source::{EntrySource, ViewFilter, ViewItem};
use crate::error::Result;
use crate::storage::Platform;

pub const DEFAULT_PAGE_SIZE: usize = 30;

/// How a view fetches its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStrategy {
    /// One unbounded fetch per filter; no "load more".
    NonPaginating,
    /// Fixed-size pages appended on demand.
    Paginating { page_size: usize },
}

impl ViewStrategy {
    /// Native shells read everything at once; browsers page.
    pub const fn for_platform(platform: Platform, page_size: usize) -> Self {
        match platform {
            Platform::Native => Self::NonPaginating,
            Platform::Browser => Self::Paginating { page_size },
        }
    }

    pub const fn page_size(self) -> Option<usize> {
        match self {
            Self::NonPaginating => None,
            Self::Paginating { page_size } => Some(page_size),
        }
    }
}

/// A fetch issued under a specific filter generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub filter: ViewFilter,
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was merged into the view.
    Applied { added: usize, has_more: bool },
    /// The page belonged to an older filter or offset and was dropped.
    Discarded,
    /// Nothing left to load.
    Exhausted,
}

#[derive(Debug)]
struct ViewState<T> {
    generation: u64,
    filter: ViewFilter,
    items: Vec<T>,
    keys: HashSet<String>,
    offset: usize,
    has_more: bool,
    loaded: bool,
}

impl<T> ViewState<T> {
    fn new(filter: ViewFilter) -> Self {
        Self {
            generation: 0,
            filter,
            items: Vec::new(),
            keys: HashSet::new(),
            offset: 0,
            has_more: false,
            loaded: false,
        }
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.items.clear();
        self.keys.clear();
        self.offset = 0;
        self.has_more = false;
        self.loaded = false;
    }
}

/// De-duplicated, append-only sequence of entries for display.
///
/// Every fetch is tagged with the filter generation it was issued under.
/// Changing the filter bumps the generation and clears the view in one step,
/// so a late response for the old filter is discarded instead of merged.
pub struct PaginatedView<S: EntrySource> {
    source: S,
    strategy: ViewStrategy,
    state: Mutex<ViewState<S::Item>>,
}

impl<S: EntrySource> PaginatedView<S> {
    pub fn new(source: S, strategy: ViewStrategy) -> Self {
        Self {
            source,
            strategy,
            state: Mutex::new(ViewState::new(ViewFilter::default())),
        }
    }

    /// View whose strategy follows the detected platform.
    pub fn for_platform(source: S, platform: Platform, page_size: usize) -> Self {
        Self::new(source, ViewStrategy::for_platform(platform, page_size))
    }

    pub const fn strategy(&self) -> ViewStrategy {
        self.strategy
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Switch to `filter`, emptying the view. Returns `false` if unchanged.
    pub async fn set_filter(&self, filter: ViewFilter) -> bool {
        let mut state = self.state.lock().await;
        if state.filter == filter {
            return false;
        }
        state.clear();
        state.filter = filter;
        tracing::debug!("View filter changed (generation {})", state.generation);
        true
    }

    /// Empty the view under the current filter, e.g. after a refresh.
    pub async fn reset(&self) {
        self.state.lock().await.clear();
    }

    /// Request for the first page under the current filter.
    pub async fn begin_initial(&self) -> PageRequest {
        let state = self.state.lock().await;
        PageRequest {
            generation: state.generation,
            filter: state.filter.clone(),
            offset: 0,
            limit: self.strategy.page_size(),
        }
    }

    /// Request for the next page, or `None` when there is nothing to load.
    pub async fn begin_next(&self) -> Option<PageRequest> {
        let state = self.state.lock().await;
        let page_size = self.strategy.page_size()?;
        if !state.loaded || !state.has_more {
            return None;
        }
        Some(PageRequest {
            generation: state.generation,
            filter: state.filter.clone(),
            offset: state.offset,
            limit: Some(page_size),
        })
    }

    /// Merge a fetched page. Stale requests are discarded.
    pub async fn apply(&self, request: &PageRequest, items: Vec<S::Item>) -> PageOutcome {
        let mut state = self.state.lock().await;
        if request.generation != state.generation {
            tracing::debug!(
                "Discarding page for generation {} (current {})",
                request.generation,
                state.generation
            );
            return PageOutcome::Discarded;
        }
        if request.offset != 0 && request.offset != state.offset {
            return PageOutcome::Discarded;
        }

        if request.offset == 0 {
            state.items.clear();
            state.keys.clear();
            state.offset = 0;
        }

        let fetched = items.len();
        let mut added = 0;
        for item in items {
            if state.keys.insert(item.view_key()) {
                state.items.push(item);
                added += 1;
            }
        }

        state.offset += fetched;
        state.has_more = match self.strategy {
            ViewStrategy::NonPaginating => false,
            ViewStrategy::Paginating { page_size } => fetched == page_size,
        };
        state.loaded = true;
        PageOutcome::Applied {
            added,
            has_more: state.has_more,
        }
    }

    /// Fetch and apply the first page.
    pub async fn load_initial(&self) -> Result<PageOutcome> {
        let request = self.begin_initial().await;
        let items = self
            .source
            .fetch(&request.filter, request.limit, request.offset)
            .await?;
        Ok(self.apply(&request, items).await)
    }

    /// Fetch and apply the next page, if any.
    pub async fn load_more(&self) -> Result<PageOutcome> {
        let Some(request) = self.begin_next().await else {
            return Ok(PageOutcome::Exhausted);
        };
        let items = self
            .source
            .fetch(&request.filter, request.limit, request.offset)
            .await?;
        Ok(self.apply(&request, items).await)
    }

    pub async fn items(&self) -> Vec<S::Item> {
        self.state.lock().await.items.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.items.is_empty()
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    pub async fn filter(&self) -> ViewFilter {
        self.state.lock().await.filter.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::models::{EntryDraft, EntryType, OfflineRecord};
    use crate::offline::OfflineEntryStore;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Item(&'static str);

    impl ViewItem for Item {
        fn view_key(&self) -> String {
            self.0.to_string()
        }
    }

    /// Serves canned pages keyed by offset and logs each request.
    #[derive(Default)]
    struct PagedSource {
        pages: BTreeMap<usize, Vec<Item>>,
        requests: StdMutex<Vec<(Option<usize>, usize)>>,
    }

    impl PagedSource {
        fn with_pages(pages: &[(usize, &[&'static str])]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(offset, names)| {
                        (*offset, names.iter().copied().map(Item).collect())
                    })
                    .collect(),
                requests: StdMutex::default(),
            }
        }
    }

    impl EntrySource for PagedSource {
        type Item = Item;

        async fn fetch(
            &self,
            _filter: &ViewFilter,
            limit: Option<usize>,
            offset: usize,
        ) -> Result<Vec<Item>> {
            self.requests.lock().unwrap().push((limit, offset));
            Ok(self.pages.get(&offset).cloned().unwrap_or_default())
        }
    }

    fn names(items: &[Item]) -> Vec<&'static str> {
        items.iter().map(|item| item.0).collect()
    }

    #[test]
    fn strategy_follows_platform() {
        assert_eq!(
            ViewStrategy::for_platform(Platform::Native, 30),
            ViewStrategy::NonPaginating
        );
        assert_eq!(
            ViewStrategy::for_platform(Platform::Browser, 30).page_size(),
            Some(30)
        );
    }

    #[tokio::test]
    async fn pages_accumulate_without_duplicates() {
        let source = PagedSource::with_pages(&[(0, &["a", "b"]), (2, &["b", "c"])]);
        let view = PaginatedView::new(source, ViewStrategy::Paginating { page_size: 2 });

        assert_eq!(
            view.load_initial().await.unwrap(),
            PageOutcome::Applied {
                added: 2,
                has_more: true
            }
        );
        assert_eq!(
            view.load_more().await.unwrap(),
            PageOutcome::Applied {
                added: 1,
                has_more: true
            }
        );
        assert_eq!(names(&view.items().await), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn short_page_ends_paging() {
        let source = PagedSource::with_pages(&[(0, &["a", "b"]), (2, &["c"])]);
        let view = PaginatedView::new(source, ViewStrategy::Paginating { page_size: 2 });

        view.load_initial().await.unwrap();
        assert!(view.has_more().await);
        assert_eq!(
            view.load_more().await.unwrap(),
            PageOutcome::Applied {
                added: 1,
                has_more: false
            }
        );
        assert_eq!(view.load_more().await.unwrap(), PageOutcome::Exhausted);
        assert_eq!(names(&view.items().await), vec!["a", "b", "c"]);
        assert_eq!(
            *view.source().requests.lock().unwrap(),
            vec![(Some(2), 0), (Some(2), 2)]
        );
    }

    #[tokio::test]
    async fn initial_page_replaces_accumulated_items() {
        let source = PagedSource::with_pages(&[(0, &["a", "b"]), (2, &["c", "d"])]);
        let view = PaginatedView::new(source, ViewStrategy::Paginating { page_size: 2 });

        view.load_initial().await.unwrap();
        view.load_more().await.unwrap();
        view.load_initial().await.unwrap();

        assert_eq!(names(&view.items().await), vec!["a", "b"]);
        assert!(view.has_more().await);
    }

    #[tokio::test]
    async fn filter_change_discards_in_flight_page() {
        let view = PaginatedView::new(
            PagedSource::default(),
            ViewStrategy::Paginating { page_size: 2 },
        );
        let stale = view.begin_initial().await;

        assert!(
            view.set_filter(ViewFilter::default().with_type(Some(EntryType::Place)))
                .await
        );
        assert!(view.is_empty().await);
        assert!(!view.is_loaded().await);

        let outcome = view.apply(&stale, vec![Item("old")]).await;
        assert_eq!(outcome, PageOutcome::Discarded);
        assert!(view.is_empty().await);

        let fresh = view.begin_initial().await;
        assert_eq!(fresh.filter.entry_type, Some(EntryType::Place));
        view.apply(&fresh, vec![Item("new")]).await;
        assert_eq!(names(&view.items().await), vec!["new"]);
    }

    #[tokio::test]
    async fn filter_change_clears_loaded_pages() {
        let source = PagedSource::with_pages(&[(0, &["a", "b"])]);
        let view = PaginatedView::new(source, ViewStrategy::Paginating { page_size: 2 });
        view.load_initial().await.unwrap();

        assert!(!view.set_filter(ViewFilter::default()).await);
        assert_eq!(view.len().await, 2);

        view.set_filter(ViewFilter::default().with_query("x")).await;
        assert!(view.is_empty().await);
        assert!(!view.has_more().await);
        assert_eq!(view.begin_next().await, None);
        assert_eq!(view.filter().await.query.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn duplicate_next_page_is_discarded() {
        let source = PagedSource::with_pages(&[(0, &["a", "b"]), (2, &["c", "d"])]);
        let view = PaginatedView::new(source, ViewStrategy::Paginating { page_size: 2 });
        view.load_initial().await.unwrap();

        let first = view.begin_next().await.unwrap();
        let second = view.begin_next().await.unwrap();
        view.apply(&first, vec![Item("c"), Item("d")]).await;

        assert_eq!(
            view.apply(&second, vec![Item("c"), Item("d")]).await,
            PageOutcome::Discarded
        );
        assert_eq!(view.len().await, 4);
    }

    #[tokio::test]
    async fn non_paginating_reads_everything_once() {
        let source = PagedSource::with_pages(&[(0, &["a", "b", "c", "d", "e"])]);
        let view = PaginatedView::new(source, ViewStrategy::NonPaginating);

        assert_eq!(view.begin_next().await, None);
        assert_eq!(
            view.load_initial().await.unwrap(),
            PageOutcome::Applied {
                added: 5,
                has_more: false
            }
        );
        assert_eq!(view.load_more().await.unwrap(), PageOutcome::Exhausted);
        assert_eq!(*view.source().requests.lock().unwrap(), vec![(None, 0)]);
    }

    #[tokio::test]
    async fn store_backed_view_pages_merged_entries() {
        let store = OfflineEntryStore::in_memory(Platform::Browser);
        for title in ["one", "two", "three"] {
            store
                .create_local(EntryDraft::new(title, "", EntryType::Journal))
                .await
                .unwrap();
        }
        let view = PaginatedView::for_platform(store, Platform::Browser, 2);

        view.load_initial().await.unwrap();
        view.load_more().await.unwrap();

        let items: Vec<OfflineRecord> = view.items().await;
        assert_eq!(items.len(), 3);
        assert!(!view.has_more().await);
    }
}
