//! Data models for Inkwell

mod entry;
mod remote;

pub use entry::{
    EntryDraft, EntryPatch, EntryType, OfflineRecord, RecordOrigin, SyncAction, TempId,
};
pub use remote::{EntryFields, RemoteEntry};
