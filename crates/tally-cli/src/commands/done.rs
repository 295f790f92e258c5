use chrono::NaiveDate;
use tally_core::models::EntryKind;

use crate::commands::common::{resolve_entry, short_id, today, CliContext};
use crate::error::CliError;

pub async fn run_done(
    id: &str,
    date: Option<NaiveDate>,
    done: bool,
    context: &CliContext,
) -> Result<(), CliError> {
    let repo = context.open_repository()?;
    let entry = resolve_entry(id, &repo).await?;
    let date = date.unwrap_or_else(today);

    let updated = if done {
        repo.mark_done(&entry.id, date).await?
    } else {
        repo.unmark_done(&entry.id, date).await?
    };

    let verb = if done { "Marked" } else { "Cleared" };
    match updated.kind {
        EntryKind::Habit { streak_count, .. } => println!(
            "{verb} {} on {date} (streak {})",
            short_id(&updated.id),
            streak_count.unwrap_or(0)
        ),
        EntryKind::Task { .. } => {
            println!("{verb} {} on {date}", short_id(&updated.id));
        }
    }
    Ok(())
}
