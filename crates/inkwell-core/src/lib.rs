//! inkwell-core - Core library for Inkwell
//!
//! Offline-first entry handling shared by every Inkwell client: a key/value
//! backend chosen once per process, an offline entry store that keeps unsynced
//! writes apart from the cached server snapshot, a reconciler that replays
//! pending mutations against the remote entry API, and an accumulating
//! paginated view over either source.

pub mod config;
pub mod error;
pub mod models;
pub mod offline;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;
pub mod view;

pub use error::{Error, Result};
pub use models::{EntryDraft, EntryPatch, EntryType, OfflineRecord, SyncAction, TempId};
pub use offline::OfflineEntryStore;
pub use state::SyncState;
