use std::sync::Arc;

use tally_core::sync::{
    cancellation, CancellationSignal, SyncSummary, SyncTrigger, SyncWorker,
};

use crate::commands::common::{
    format_sync_conflict_lines, sync_conflict_to_item, CliContext, SyncConflictItem,
};
use crate::error::CliError;

pub async fn run_sync(context: &CliContext) -> Result<(), CliError> {
    if context.remote.is_none() {
        return Err(CliError::SyncNotConfigured);
    }

    let repo = context.open_repository()?;
    let summary = repo.sync_now(&CancellationSignal::never()).await;
    for line in format_sync_summary(&summary) {
        println!("{line}");
    }

    match summary.push.failure.or(summary.pull.failure) {
        Some(failure) => Err(failure.into_cause().into()),
        None => Ok(()),
    }
}

/// Sync on an interval until ctrl-c
pub async fn run_sync_watch(
    interval_override: Option<u64>,
    context: &CliContext,
) -> Result<(), CliError> {
    if context.remote.is_none() {
        return Err(CliError::SyncNotConfigured);
    }

    let settings = context.config.sync_settings(interval_override);
    let repo = context.open_repository()?;
    let (_trigger, requests) = SyncTrigger::channel();
    let worker = SyncWorker::new(Arc::clone(repo.engine()), requests, settings.interval);
    let (handle, signal) = cancellation();

    println!(
        "Syncing every {}s, press Ctrl-C to stop",
        settings.interval.as_secs()
    );
    let interrupt = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "Failed to listen for Ctrl-C");
        }
        handle.cancel();
    };
    tokio::join!(worker.run(signal), interrupt);

    println!("Sync stopped");
    Ok(())
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    context: &CliContext,
) -> Result<(), CliError> {
    let repo = context.open_repository()?;
    let conflicts = repo.conflicts(limit).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_sync_summary(summary: &SyncSummary) -> Vec<String> {
    let push = &summary.push;
    let pull = &summary.pull;
    let mut lines = vec![
        format!(
            "Pushed {} ({} retrying, {} failed)",
            push.synced(),
            push.retrying(),
            push.failed()
        ),
        format!(
            "Pulled {} ({} stale, {} deleted locally, {} invalid)",
            pull.applied, pull.stale, pull.tombstoned, pull.invalid
        ),
    ];
    if summary.cancelled() {
        lines.push("Sync cancelled".to_string());
    }
    lines
}
