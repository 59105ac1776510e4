use inkwell_core::sync::SyncReport;

use crate::error::CliError;
use crate::session::Session;

pub async fn run_sync(session: &Session) -> Result<(), CliError> {
    let reconciler = session.reconciler()?;
    let report = reconciler.reconcile().await?;

    for line in format_sync_report(&report) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_refresh(session: &Session) -> Result<(), CliError> {
    let reconciler = session.reconciler()?;
    let cached = reconciler.refresh_cache(session.config.page_size()).await?;

    println!("Cached {cached} remote entries");
    Ok(())
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Sync completed: {} attempted, {} synced, {} deleted",
        report.attempted, report.synced, report.deleted
    )];

    if report.deferred > 0 {
        lines.push(format!(
            "{} entries changed during sync and will be sent next time",
            report.deferred
        ));
    }
    for failure in &report.failures {
        lines.push(format!(
            "  failed {} {}: {}",
            failure.action, failure.temp_id, failure.message
        ));
    }
    lines.push(format!(
        "State: {} ({} pending)",
        report.state().label(),
        report.pending
    ));
    lines
}
