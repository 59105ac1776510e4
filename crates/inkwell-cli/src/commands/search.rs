use inkwell_core::view::ViewFilter;
use inkwell_core::EntryType;

use crate::commands::common::{collect_entries, normalize_search_query, print_entries};
use crate::error::CliError;
use crate::session::Session;

pub async fn run_search(
    session: &Session,
    query: &str,
    entry_type: Option<EntryType>,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let normalized_query = normalize_search_query(query)?;
    let filter = ViewFilter::default()
        .with_type(entry_type)
        .with_query(normalized_query);
    let entries = collect_entries(session, filter, limit).await?;
    print_entries(&entries, as_json)
}
