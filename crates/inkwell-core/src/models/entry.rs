//! Offline entry model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Error;

/// Namespace for temp ids derived from server ids.
const SERVER_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6b1f_4c2e_9a0d_4f7b_8e35_2d1c_0a9f_e471);

/// Kind of journal entry. The structured data schema depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Journal,
    Note,
    Person,
    Place,
    Thing,
}

impl EntryType {
    pub const ALL: [Self; 5] = [
        Self::Journal,
        Self::Note,
        Self::Person,
        Self::Place,
        Self::Thing,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::Note => "note",
            Self::Person => "person",
            Self::Place => "place",
            Self::Thing => "thing",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown entry type: {s}")))
    }
}

/// Mutation an unsynced record represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    #[default]
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locally generated record identifier, using UUID v7 (time-sortable).
///
/// Never reused and never mutated once assigned. It doubles as the storage key
/// of the record in the unsynced partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(Uuid);

impl TempId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Deterministic temp id for a record that originated on the server.
    #[must_use]
    pub fn for_server_id(server_id: i64) -> Self {
        Self(Uuid::new_v5(
            &SERVER_ID_NAMESPACE,
            server_id.to_string().as_bytes(),
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TempId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Partition a record was read from. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordOrigin {
    #[default]
    Unsynced,
    Cached,
}

/// The unit of local persistence.
///
/// Cached records share this shape but are always `synced` and keyed by
/// `server_id` instead of `temp_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineRecord {
    pub temp_id: TempId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub entry_type: EntryType,
    pub occurs_on: DateTime<Utc>,
    #[serde(default)]
    pub structured_data: Value,
    pub synced: bool,
    #[serde(default)]
    pub action: SyncAction,
    /// Wall clock of the last local mutation (Unix ms)
    pub local_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip)]
    pub origin: RecordOrigin,
}

impl OfflineRecord {
    /// Build a fresh unsynced create from a draft.
    #[must_use]
    pub fn from_draft(draft: EntryDraft, local_timestamp: i64) -> Self {
        Self {
            temp_id: TempId::new(),
            server_id: None,
            title: draft.title,
            content: draft.content,
            entry_type: draft.entry_type,
            occurs_on: draft.occurs_on,
            structured_data: draft.structured_data,
            synced: false,
            action: SyncAction::Create,
            local_timestamp,
            owner: draft.owner,
            origin: RecordOrigin::Unsynced,
        }
    }

    /// True when this record is waiting for reconciliation.
    pub const fn is_pending(&self) -> bool {
        !self.synced
    }

    pub const fn is_pending_delete(&self) -> bool {
        !self.synced && matches!(self.action, SyncAction::Delete)
    }

    /// Case-insensitive substring match against title or content.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_query(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }

    /// First line of the content, truncated to `max_len` characters.
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        let source = if self.title.trim().is_empty() {
            self.content.lines().next().unwrap_or("")
        } else {
            self.title.as_str()
        };
        source.trim().chars().take(max_len).collect()
    }
}

/// A new entry before it has any identity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub title: String,
    pub content: String,
    pub entry_type: EntryType,
    pub occurs_on: DateTime<Utc>,
    pub structured_data: Value,
    pub owner: Option<String>,
}

impl EntryDraft {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        entry_type: EntryType,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            entry_type,
            occurs_on: Utc::now(),
            structured_data: Value::Null,
            owner: None,
        }
    }

    #[must_use]
    pub const fn occurs_on(mut self, occurs_on: DateTime<Utc>) -> Self {
        self.occurs_on = occurs_on;
        self
    }

    #[must_use]
    pub fn structured_data(mut self, structured_data: Value) -> Self {
        self.structured_data = structured_data;
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Partial fields merged into an existing record by `update_local`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub entry_type: Option<EntryType>,
    pub occurs_on: Option<DateTime<Utc>>,
    pub structured_data: Option<Value>,
    pub owner: Option<String>,
    pub server_id: Option<i64>,
    pub synced: Option<bool>,
    pub action: Option<SyncAction>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge every present field into `record`. Identity is never touched.
    pub fn apply(self, record: &mut OfflineRecord) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(content) = self.content {
            record.content = content;
        }
        if let Some(entry_type) = self.entry_type {
            record.entry_type = entry_type;
        }
        if let Some(occurs_on) = self.occurs_on {
            record.occurs_on = occurs_on;
        }
        if let Some(structured_data) = self.structured_data {
            record.structured_data = structured_data;
        }
        if let Some(owner) = self.owner {
            record.owner = Some(owner);
        }
        if let Some(server_id) = self.server_id {
            record.server_id = Some(server_id);
        }
        if let Some(synced) = self.synced {
            record.synced = synced;
        }
        if let Some(action) = self.action {
            record.action = action;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn temp_ids_are_unique() {
        let a = TempId::new();
        let b = TempId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn temp_id_round_trips_through_string() {
        let id = TempId::new();
        let parsed: TempId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn server_derived_temp_id_is_stable() {
        assert_eq!(TempId::for_server_id(42), TempId::for_server_id(42));
        assert_ne!(TempId::for_server_id(42), TempId::for_server_id(43));
    }

    #[test]
    fn entry_type_parses_case_insensitively() {
        assert_eq!("Journal".parse::<EntryType>().unwrap(), EntryType::Journal);
        assert_eq!(" place ".parse::<EntryType>().unwrap(), EntryType::Place);
        assert!("recipe".parse::<EntryType>().is_err());
    }

    #[test]
    fn record_serializes_camel_case_without_origin() {
        let draft = EntryDraft::new("Walk", "Along the river", EntryType::Journal);
        let mut record = OfflineRecord::from_draft(draft, 10);
        record.origin = RecordOrigin::Cached;

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["entryType"], "journal");
        assert_eq!(json["localTimestamp"], 10);
        assert_eq!(json["action"], "create");
        assert!(json.get("origin").is_none());
        assert!(json.get("serverId").is_none());

        let decoded: OfflineRecord = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.origin, RecordOrigin::Unsynced);
        assert_eq!(decoded.temp_id, record.temp_id);
    }

    #[test]
    fn missing_action_defaults_to_create() {
        let json = serde_json::json!({
            "tempId": TempId::new(),
            "serverId": 7,
            "title": "t",
            "content": "c",
            "entryType": "note",
            "occursOn": "2024-05-01T00:00:00Z",
            "synced": true,
            "localTimestamp": 1
        });
        let record: OfflineRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.action, SyncAction::Create);
        assert_eq!(record.structured_data, Value::Null);
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut record =
            OfflineRecord::from_draft(EntryDraft::new("Old", "Body", EntryType::Note), 1);
        EntryPatch {
            title: Some("New".to_string()),
            ..EntryPatch::default()
        }
        .apply(&mut record);

        assert_eq!(record.title, "New");
        assert_eq!(record.content, "Body");
        assert!(EntryPatch::default().is_empty());
    }

    #[test]
    fn preview_falls_back_to_content() {
        let record = OfflineRecord::from_draft(
            EntryDraft::new("  ", "First line\nSecond", EntryType::Thing),
            1,
        );
        assert_eq!(record.preview(5), "First");
    }
}
