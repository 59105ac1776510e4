use crate::error::CliError;
use crate::session::Session;

pub async fn run_reset(session: &Session, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ConfirmationRequired);
    }

    let pending = session.store.pending_count().await?;
    session.store.clear_all().await?;
    if pending > 0 {
        println!("Cleared local entries ({pending} unsynced change(s) discarded)");
    } else {
        println!("Cleared local entries");
    }
    Ok(())
}
