use inkwell_core::view::ViewFilter;
use inkwell_core::EntryType;

use crate::commands::common::{collect_entries, print_entries};
use crate::error::CliError;
use crate::session::Session;

pub async fn run_list(
    session: &Session,
    entry_type: Option<EntryType>,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let filter = ViewFilter::default().with_type(entry_type);
    let entries = collect_entries(session, filter, limit).await?;
    print_entries(&entries, as_json)
}
