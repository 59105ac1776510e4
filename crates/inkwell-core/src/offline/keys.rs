//! Key namespaces on the selected backend.

use crate::models::{RecordOrigin, TempId};

/// Prefix of unsynced-partition keys, followed by the temp id.
pub const OFFLINE_ENTRY_PREFIX: &str = "offline_entry_";
/// Prefix of cached-partition keys, followed by the server id.
pub const CACHED_ENTRY_PREFIX: &str = "cached_entry_";
/// Reserved so no record key can ever collide with it. Holds no payload.
pub const SYNC_QUEUE_KEY: &str = "sync_queue";

/// Logical key space a stored record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Unsynced,
    Cached,
}

impl Partition {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Unsynced => OFFLINE_ENTRY_PREFIX,
            Self::Cached => CACHED_ENTRY_PREFIX,
        }
    }

    pub const fn origin(self) -> RecordOrigin {
        match self {
            Self::Unsynced => RecordOrigin::Unsynced,
            Self::Cached => RecordOrigin::Cached,
        }
    }

    /// Partition owning `key`, `None` for foreign or reserved keys.
    pub fn classify(key: &str) -> Option<Self> {
        if key.starts_with(OFFLINE_ENTRY_PREFIX) {
            Some(Self::Unsynced)
        } else if key.starts_with(CACHED_ENTRY_PREFIX) {
            Some(Self::Cached)
        } else {
            None
        }
    }

    pub fn contains(self, key: &str) -> bool {
        key.starts_with(self.prefix())
    }
}

pub fn offline_key(temp_id: TempId) -> String {
    format!("{OFFLINE_ENTRY_PREFIX}{temp_id}")
}

pub fn cached_key(server_id: i64) -> String {
    format!("{CACHED_ENTRY_PREFIX}{server_id}")
}

/// Whether `key` is owned by the entry store (either partition or the reserved key).
pub fn is_store_key(key: &str) -> bool {
    key == SYNC_QUEUE_KEY || Partition::classify(key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_land_in_their_partition() {
        let temp_id = TempId::new();
        assert_eq!(
            Partition::classify(&offline_key(temp_id)),
            Some(Partition::Unsynced)
        );
        assert_eq!(Partition::classify(&cached_key(5)), Some(Partition::Cached));
        assert_eq!(cached_key(5), "cached_entry_5");
    }

    #[test]
    fn reserved_and_foreign_keys_are_unclassified() {
        assert_eq!(Partition::classify(SYNC_QUEUE_KEY), None);
        assert_eq!(Partition::classify("theme"), None);
        assert!(is_store_key(SYNC_QUEUE_KEY));
        assert!(!is_store_key("theme"));
    }
}
