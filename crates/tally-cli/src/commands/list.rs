use chrono::NaiveDate;
use tally_core::Entry;

use crate::commands::common::{
    entry_to_list_item, format_entry_lines, today, CliContext, EntryListItem,
};
use crate::error::CliError;

/// Which entries a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Day(Option<NaiveDate>),
    Tasks,
    Habits,
}

pub async fn run_list(listing: Listing, as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let repo = context.open_repository()?;
    let entries = match listing {
        Listing::Day(date) => repo.visible_on(date.unwrap_or_else(today)).await?,
        Listing::Tasks => repo.get_tasks().await?,
        Listing::Habits => repo.get_habits().await?,
    };

    print_entries(&entries, as_json)
}

fn print_entries(entries: &[Entry], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let json_items = entries
            .iter()
            .map(entry_to_list_item)
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Nothing here.");
        return Ok(());
    }

    for line in format_entry_lines(entries) {
        println!("{line}");
    }
    Ok(())
}
