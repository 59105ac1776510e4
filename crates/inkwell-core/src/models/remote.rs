//! Canonical remote entry resource

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entry::{EntryType, OfflineRecord, RecordOrigin, SyncAction, TempId};

/// Entry as delivered by the remote entry API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub structured_data: Value,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry fields sent on create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFields {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub date: DateTime<Utc>,
    pub structured_data: Value,
}

impl From<&OfflineRecord> for EntryFields {
    fn from(record: &OfflineRecord) -> Self {
        Self {
            title: record.title.clone(),
            content: record.content.clone(),
            entry_type: record.entry_type,
            date: record.occurs_on,
            structured_data: record.structured_data.clone(),
        }
    }
}

impl OfflineRecord {
    /// Cached-partition record mirroring authoritative server state.
    #[must_use]
    pub fn from_remote(entry: RemoteEntry) -> Self {
        Self {
            temp_id: TempId::for_server_id(entry.id),
            server_id: Some(entry.id),
            title: entry.title,
            content: entry.content,
            entry_type: entry.entry_type,
            occurs_on: entry.date,
            structured_data: entry.structured_data,
            synced: true,
            action: SyncAction::Create,
            local_timestamp: entry.updated_at.timestamp_millis(),
            owner: entry.owner_id,
            origin: RecordOrigin::Cached,
        }
    }
}
