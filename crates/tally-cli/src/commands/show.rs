use serde::Serialize;
use tally_core::models::DoneEntry;

use crate::commands::common::{
    entry_to_list_item, format_done_lines, format_timestamp, resolve_entry, CliContext,
    EntryListItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct EntryDetail {
    #[serde(flatten)]
    entry: EntryListItem,
    done: Vec<DoneEntry>,
}

pub async fn run_show(id: &str, as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let repo = context.open_repository()?;
    let entry = resolve_entry(id, &repo).await?;
    let history = repo.done_history(&entry.id).await?;

    if as_json {
        let detail = EntryDetail {
            entry: entry_to_list_item(&entry),
            done: history,
        };
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let item = entry_to_list_item(&entry);
    println!("{}  {}", item.entry_type, item.id);
    println!("title:       {}", item.title);
    if !item.description.is_empty() {
        println!("description: {}", item.description);
    }
    println!("done:        {}", if item.is_done { "yes" } else { "no" });
    if let Some(time) = &item.time {
        println!("time:        {time}");
    }
    if let Some(due_date) = item.due_date {
        println!("due:         {due_date}");
    }
    if let Some(recurrence) = &item.recurrence {
        println!("recurrence:  {recurrence}");
    }
    if let Some(start_date) = item.start_date {
        println!("start:       {start_date}");
    }
    if let Some(streak) = item.streak_count {
        println!("streak:      {streak}");
    }
    println!("created:     {}", format_timestamp(item.created_at));
    if let Some(updated_at) = item.updated_at {
        println!("updated:     {}", format_timestamp(updated_at));
    }
    println!("sync:        {}", item.sync_state);

    if !history.is_empty() {
        println!("history:");
        for line in format_done_lines(&history) {
            println!("  {line}");
        }
    }
    Ok(())
}
