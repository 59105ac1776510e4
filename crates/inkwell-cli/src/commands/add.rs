use inkwell_core::{EntryDraft, EntryType};

use crate::commands::common::{derive_title, parse_occurs_on, resolve_entry_content};
use crate::error::CliError;
use crate::session::Session;

pub async fn run_add(
    session: &Session,
    content_parts: &[String],
    title: Option<String>,
    entry_type: EntryType,
    date: Option<&str>,
) -> Result<(), CliError> {
    let content = resolve_entry_content(content_parts)?;
    let title = title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| derive_title(&content));

    let mut draft = EntryDraft::new(title, content, entry_type);
    if let Some(date) = date {
        draft = draft.occurs_on(parse_occurs_on(date)?);
    }

    let temp_id = session.store.create_local(draft).await?;
    println!("{temp_id}");
    Ok(())
}
