use inkwell_core::EntryPatch;

use crate::commands::common::{
    capture_editor_input_with_initial, normalize_content, resolve_entry_id,
};
use crate::error::CliError;
use crate::session::Session;

pub async fn run_edit(
    session: &Session,
    id: &str,
    title: Option<String>,
    content: Option<String>,
) -> Result<(), CliError> {
    let temp_id = resolve_entry_id(id, &session.store).await?;
    let entry = session
        .store
        .get(temp_id)
        .await?
        .ok_or_else(|| CliError::EntryNotFound(id.trim().to_string()))?;

    let mut patch = EntryPatch {
        title: title.and_then(|title| normalize_content(&title)),
        ..EntryPatch::default()
    };

    match content {
        Some(content) => {
            let content = normalize_content(&content).ok_or(CliError::EmptyEditedContent)?;
            patch.content = Some(content);
        }
        None if patch.title.is_none() => {
            let Some(edited) = capture_editor_input_with_initial(&entry.content)? else {
                return Err(CliError::EmptyEditedContent);
            };
            if edited == entry.content {
                println!("{temp_id}");
                return Ok(());
            }
            patch.content = Some(edited);
        }
        None => {}
    }

    if !session.store.stage_edit(temp_id, patch).await? {
        return Err(CliError::EntryNotFound(id.trim().to_string()));
    }
    println!("{temp_id}");
    Ok(())
}
