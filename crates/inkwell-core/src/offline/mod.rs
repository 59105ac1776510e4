//! Offline entry store: unsynced writes and the cached server snapshot.

mod keys;
mod store;

pub use keys::{Partition, CACHED_ENTRY_PREFIX, OFFLINE_ENTRY_PREFIX, SYNC_QUEUE_KEY};
pub use store::{EntryCounts, OfflineEntryStore, ReplayOutcome};

#[cfg(test)]
pub(crate) use store::test_support;
