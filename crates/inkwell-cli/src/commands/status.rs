use inkwell_core::{EntryType, SyncState};
use serde::Serialize;

use crate::error::CliError;
use crate::session::Session;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub platform: &'static str,
    pub state: &'static str,
    pub pending: usize,
    pub total: usize,
    pub by_type: Vec<(EntryType, usize)>,
    pub remote: Option<String>,
}

pub async fn run_status(session: &Session, as_json: bool) -> Result<(), CliError> {
    let report = collect_status(session).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Platform: {}", report.platform);
    println!(
        "Remote:   {}",
        report.remote.as_deref().unwrap_or("not configured")
    );
    println!("State:    {} ({} pending)", report.state, report.pending);
    println!("Entries:  {}", report.total);
    for (entry_type, count) in &report.by_type {
        println!("  {:<7} {count}", entry_type.as_str());
    }
    Ok(())
}

/// Without a remote the indicator stays offline regardless of pending work.
pub async fn collect_status(session: &Session) -> Result<StatusReport, CliError> {
    let counts = session.store.counts_by_type().await?;
    let pending = session.store.pending_count().await?;
    let state = if session.config.has_remote() {
        SyncState::from_pending(pending)
    } else {
        SyncState::Offline
    };

    Ok(StatusReport {
        platform: session.config.platform().as_str(),
        state: state.label(),
        pending,
        total: counts.total,
        by_type: counts.by_type.into_iter().collect(),
        remote: session.config.api_base_url.clone(),
    })
}
