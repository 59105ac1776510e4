use crate::commands::common::resolve_entry_id;
use crate::error::CliError;
use crate::session::Session;

pub async fn run_delete(session: &Session, id: &str) -> Result<(), CliError> {
    let temp_id = resolve_entry_id(id, &session.store).await?;

    if !session.store.stage_delete(temp_id).await? {
        return Err(CliError::EntryNotFound(id.trim().to_string()));
    }
    println!("{temp_id}");
    Ok(())
}
