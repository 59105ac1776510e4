//! Remote entry API contract.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{EntryFields, EntryType, RemoteEntry};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote API configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {message} ({status})")]
    Api { status: u16, message: String },
    #[error("Invalid remote API payload: {0}")]
    InvalidPayload(String),
}

impl RemoteError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Create/update/delete/list/search over the canonical entry resource.
///
/// Timeouts and retries belong to the implementation.
#[allow(async_fn_in_trait)]
pub trait RemoteEntryApi {
    /// Create an entry and return its server id.
    async fn create(&self, fields: &EntryFields) -> RemoteResult<i64>;

    async fn update(&self, id: i64, fields: &EntryFields) -> RemoteResult<()>;

    async fn delete(&self, id: i64) -> RemoteResult<()>;

    /// One page of entries, optionally restricted to a type.
    async fn list(
        &self,
        entry_type: Option<EntryType>,
        limit: usize,
        offset: usize,
    ) -> RemoteResult<Vec<RemoteEntry>>;

    async fn search(&self, query: &str) -> RemoteResult<Vec<RemoteEntry>>;
}

impl<A: RemoteEntryApi> RemoteEntryApi for Arc<A> {
    async fn create(&self, fields: &EntryFields) -> RemoteResult<i64> {
        self.as_ref().create(fields).await
    }

    async fn update(&self, id: i64, fields: &EntryFields) -> RemoteResult<()> {
        self.as_ref().update(id, fields).await
    }

    async fn delete(&self, id: i64) -> RemoteResult<()> {
        self.as_ref().delete(id).await
    }

    async fn list(
        &self,
        entry_type: Option<EntryType>,
        limit: usize,
        offset: usize,
    ) -> RemoteResult<Vec<RemoteEntry>> {
        self.as_ref().list(entry_type, limit, offset).await
    }

    async fn search(&self, query: &str) -> RemoteResult<Vec<RemoteEntry>> {
        self.as_ref().search(query).await
    }
}
