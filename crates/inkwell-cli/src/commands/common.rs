use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, Utc};
use inkwell_core::models::RecordOrigin;
use inkwell_core::view::{PageOutcome, PaginatedView, ViewFilter};
use inkwell_core::{EntryType, OfflineEntryStore, OfflineRecord, TempId};
use serde::Serialize;

use crate::error::CliError;
use crate::session::Session;

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub id: String,
    pub server_id: Option<i64>,
    pub entry_type: EntryType,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub occurs_on: String,
    pub local_timestamp: i64,
    pub relative_time: String,
    pub synced: bool,
    pub origin: &'static str,
}

/// Load up to `limit` entries through the paginated view.
///
/// Keeps requesting pages until the view is exhausted or holds enough entries.
pub async fn collect_entries(
    session: &Session,
    filter: ViewFilter,
    limit: usize,
) -> Result<Vec<OfflineRecord>, CliError> {
    let view = entry_view(session);
    view.set_filter(filter).await;
    view.load_initial().await?;

    while view.len().await < limit {
        match view.load_more().await? {
            PageOutcome::Applied { .. } => {}
            PageOutcome::Discarded | PageOutcome::Exhausted => break,
        }
    }

    let mut entries = view.items().await;
    entries.truncate(limit);
    Ok(entries)
}

/// View over the local store, paged the way the store's platform was selected.
pub fn entry_view(session: &Session) -> PaginatedView<OfflineEntryStore> {
    PaginatedView::for_platform(
        session.store.clone(),
        session.store.platform(),
        session.config.page_size(),
    )
}

/// Resolve a user-supplied identifier to an unsynced-partition temp id.
///
/// Accepts a full temp id, a unique temp id prefix, or a server id. Entries only
/// known from the cached snapshot are adopted into the unsynced partition.
pub async fn resolve_entry_id(
    entry_query: &str,
    store: &OfflineEntryStore,
) -> Result<TempId, CliError> {
    let entry_query = normalize_entry_identifier(entry_query)?;

    if let Ok(temp_id) = entry_query.parse::<TempId>() {
        if store.get(temp_id).await?.is_some() {
            return Ok(temp_id);
        }
    }

    let entries = store.list_all().await?;
    let server_id = entry_query.trim_start_matches('#').parse::<i64>().ok();
    let matching = entries
        .iter()
        .filter(|entry| {
            server_id.is_some_and(|id| entry.server_id == Some(id))
                || entry.temp_id.to_string().starts_with(&entry_query)
        })
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::EntryNotFound(entry_query)),
        [entry] => adopt_if_cached(entry, store, &entry_query).await,
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|entry| short_id(entry))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousEntryId(format!(
                "ID prefix '{entry_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

async fn adopt_if_cached(
    entry: &OfflineRecord,
    store: &OfflineEntryStore,
    entry_query: &str,
) -> Result<TempId, CliError> {
    match (entry.origin, entry.server_id) {
        (RecordOrigin::Cached, Some(server_id)) => store
            .adopt_cached(server_id)
            .await?
            .ok_or_else(|| CliError::EntryNotFound(entry_query.to_string())),
        _ => Ok(entry.temp_id),
    }
}

pub fn short_id(entry: &OfflineRecord) -> String {
    entry.server_id.map_or_else(
        || entry.temp_id.to_string().chars().take(13).collect(),
        |id| format!("#{id}"),
    )
}

pub const fn sync_marker(entry: &OfflineRecord) -> &'static str {
    if entry.synced {
        " "
    } else {
        "*"
    }
}

pub fn format_entry_lines(entries: &[OfflineRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    entries
        .iter()
        .map(|entry| {
            let short_id = short_id(entry);
            let marker = sync_marker(entry);
            let kind = entry.entry_type.as_str();
            let preview = entry_preview(entry, 40);
            let relative_time = format_relative_time(entry.local_timestamp, now_ms);
            format!("{marker}{short_id:<13}  {kind:<7}  {preview:<40}  {relative_time}")
        })
        .collect()
}

pub fn entry_to_list_item(entry: &OfflineRecord) -> EntryListItem {
    let now_ms = Utc::now().timestamp_millis();
    EntryListItem {
        id: entry.temp_id.to_string(),
        server_id: entry.server_id,
        entry_type: entry.entry_type,
        title: entry.title.clone(),
        preview: entry_preview(entry, 80),
        content: entry.content.clone(),
        occurs_on: entry.occurs_on.to_rfc3339(),
        local_timestamp: entry.local_timestamp,
        relative_time: format_relative_time(entry.local_timestamp, now_ms),
        synced: entry.synced,
        origin: match entry.origin {
            RecordOrigin::Unsynced => "local",
            RecordOrigin::Cached => "cached",
        },
    }
}

pub fn print_entries(entries: &[OfflineRecord], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let json_items = entries
            .iter()
            .map(entry_to_list_item)
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if entries.is_empty() {
        println!("No entries.");
    } else {
        for line in format_entry_lines(entries) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn entry_preview(entry: &OfflineRecord, max_chars: usize) -> String {
    let source = if entry.title.trim().is_empty() {
        entry.content.lines().next().unwrap_or("")
    } else {
        entry.title.as_str()
    };
    let collapsed = source.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Parse `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_occurs_on(value: &str) -> Result<DateTime<Utc>, CliError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|date_time| date_time.with_timezone(&Utc))
        .map_err(|_| CliError::InvalidDate(value.to_string()))
}

/// Title for an entry created without `--title`: its first content line.
pub fn derive_title(content: &str) -> String {
    content
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .chars()
        .take(80)
        .collect()
}

pub fn resolve_entry_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    if let Some(content) = capture_editor_input_with_initial("")? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySearchQuery)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_entry_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyEntryId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_entry_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let entry_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&entry_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let status = Command::new(program).args(parts).arg(file_path).status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_entry_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("inkwell-entry-{}-{now}.md", std::process::id()))
}
