//! Accumulating, de-duplicated entry view with platform-adaptive paging.

mod paginated;
mod source;

pub use paginated::{PageOutcome, PageRequest, PaginatedView, ViewStrategy, DEFAULT_PAGE_SIZE};
pub use source::{EntrySource, RemoteSource, ViewFilter, ViewItem};
