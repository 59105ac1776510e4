//! Inkwell CLI - journal from the terminal, online or not
//!
//! Entries are written locally first and pushed to the remote entry API by
//! `inkwell sync`.

mod cli;
mod commands;
mod error;
mod session;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::reset::run_reset;
use crate::commands::search::run_search;
use crate::commands::status::run_status;
use crate::commands::sync::{run_refresh, run_sync};
use crate::error::CliError;
use crate::session::Session;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "inkwell=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let session = Session::open(cli.data_dir)?;

    match cli.command {
        Commands::Add {
            content,
            title,
            kind,
            date,
        } => run_add(&session, &content, title, kind.into(), date.as_deref()).await?,
        Commands::List { kind, limit, json } => {
            run_list(&session, kind.map(Into::into), limit, json).await?;
        }
        Commands::Search {
            query,
            kind,
            limit,
            json,
        } => run_search(&session, &query, kind.map(Into::into), limit, json).await?,
        Commands::Edit { id, title, content } => run_edit(&session, &id, title, content).await?,
        Commands::Delete { id } => run_delete(&session, &id).await?,
        Commands::Sync => run_sync(&session).await?,
        Commands::Refresh => run_refresh(&session).await?,
        Commands::Status { json } => run_status(&session, json).await?,
        Commands::Reset { yes } => run_reset(&session, yes).await?,
    }

    Ok(())
}
