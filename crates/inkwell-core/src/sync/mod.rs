//! Remote entry API contract and reconciliation of unsynced records.

mod http;
mod reconciler;
mod remote;

pub use http::HttpEntryApi;
pub use reconciler::{SyncFailure, SyncReconciler, SyncReport};
pub use remote::{RemoteEntryApi, RemoteError, RemoteResult};
