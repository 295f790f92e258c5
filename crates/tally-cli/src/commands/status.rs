use serde::Serialize;
use tally_core::db::EntryStore;
use tally_core::models::SyncState;
use tally_core::EntryId;

use crate::commands::common::{
    entry_to_list_item, format_entry_lines, format_timestamp, match_entry_id,
    normalize_entry_identifier, short_id, CliContext, EntryListItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct DeletionItem {
    id: String,
    deleted_at: i64,
    sync_state: String,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    remote_configured: bool,
    pending: Vec<EntryListItem>,
    failed: Vec<EntryListItem>,
    deletions: Vec<DeletionItem>,
}

pub async fn run_status(as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let repo = context.open_repository()?;
    let pending = repo
        .engine()
        .store()
        .get_all_by_state(SyncState::Pending)
        .await?;
    let failed = repo.failed_entries().await?;
    let mut deletions = repo.deletions(SyncState::Pending).await?;
    deletions.extend(repo.deletions(SyncState::Failed).await?);

    if as_json {
        let report = StatusReport {
            remote_configured: context.remote.is_some(),
            pending: pending.iter().map(entry_to_list_item).collect(),
            failed: failed.iter().map(entry_to_list_item).collect(),
            deletions: deletions
                .iter()
                .map(|deletion| DeletionItem {
                    id: deletion.id.to_string(),
                    deleted_at: deletion.deleted_at,
                    sync_state: deletion.sync_state.to_string(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if context.remote.is_none() {
        println!("Remote: not configured");
    }
    println!(
        "{} pending, {} failed, {} deletions queued",
        pending.len(),
        failed.len(),
        deletions.len()
    );
    for line in format_entry_lines(&pending) {
        println!("{line}");
    }
    for line in format_entry_lines(&failed) {
        println!("{line}");
    }
    for deletion in &deletions {
        println!(
            "{:<13}  deleted {}  {}",
            short_id(&deletion.id),
            format_timestamp(deletion.deleted_at),
            deletion.sync_state
        );
    }
    Ok(())
}

pub async fn run_retry(id: &str, context: &CliContext) -> Result<(), CliError> {
    let query = normalize_entry_identifier(id)?;
    let repo = context.open_repository()?;

    let failed = repo.failed_entries().await?;
    let failed_deletions = repo.deletions(SyncState::Failed).await?;
    let candidates: Vec<&EntryId> = failed
        .iter()
        .map(|entry| &entry.id)
        .chain(failed_deletions.iter().map(|deletion| &deletion.id))
        .collect();
    let id = match_entry_id(&query, candidates)?;

    if repo.retry_failed(&id).await? {
        println!("Queued {} for the next sync", short_id(&id));
    } else {
        println!("{} is not in a failed state", short_id(&id));
    }
    Ok(())
}
