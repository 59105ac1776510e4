use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use inkwell_core::EntryType;

#[derive(Parser)]
#[command(name = "inkwell")]
#[command(about = "Offline-first journal that syncs when you are back online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the directory holding local entries
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new entry (stored locally until the next sync)
    #[command(alias = "new")]
    Add {
        /// Entry content
        content: Vec<String>,
        /// Entry title (defaults to the first line of content)
        #[arg(long)]
        title: Option<String>,
        /// Entry type
        #[arg(long = "type", value_enum, default_value_t = EntryKind::Journal)]
        kind: EntryKind,
        /// Date the entry is about (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        date: Option<String>,
    },
    /// List recent entries
    List {
        /// Only show entries of this type
        #[arg(long = "type", value_enum)]
        kind: Option<EntryKind>,
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search entry titles and content
    Search {
        /// Search query
        query: String,
        /// Only show entries of this type
        #[arg(long = "type", value_enum)]
        kind: Option<EntryKind>,
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an entry (opens $EDITOR when no field is given)
    Edit {
        /// Temp ID, unique ID prefix, or server ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New content
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete an entry
    Delete {
        /// Temp ID, unique ID prefix, or server ID
        id: String,
    },
    /// Push pending local changes to the remote entry API
    Sync,
    /// Replace the cached copy of remote entries
    Refresh,
    /// Show entry counts and sync state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every locally held entry, including unsynced changes
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum EntryKind {
    Journal,
    Note,
    Person,
    Place,
    Thing,
}

impl From<EntryKind> for EntryType {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Journal => Self::Journal,
            EntryKind::Note => Self::Note,
            EntryKind::Person => Self::Person,
            EntryKind::Place => Self::Place,
            EntryKind::Thing => Self::Thing,
        }
    }
}
