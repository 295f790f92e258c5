use chrono::{NaiveDate, NaiveTime};
use tally_core::clock::{Clock, SystemClock};
use tally_core::models::Recurrence;
use tally_core::Entry;

use crate::commands::common::{normalize_title, CliContext};
use crate::error::CliError;

pub struct NewTask<'a> {
    pub title: &'a [String],
    pub due: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub description: Option<&'a str>,
}

pub struct NewHabit<'a> {
    pub title: &'a [String],
    pub recurrence: Recurrence,
    pub start: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub description: Option<&'a str>,
}

pub fn build_task(input: &NewTask<'_>, clock: &dyn Clock) -> Result<Entry, CliError> {
    let title = normalize_title(input.title)?;
    let due = input.due.unwrap_or_else(|| clock.today());
    let task = Entry::task(title, due, clock.now_millis());
    Ok(finish(task, input.time, input.description))
}

pub fn build_habit(input: &NewHabit<'_>, clock: &dyn Clock) -> Result<Entry, CliError> {
    let title = normalize_title(input.title)?;
    let start = input.start.unwrap_or_else(|| clock.today());
    let habit = Entry::habit(title, input.recurrence, start, clock.now_millis());
    Ok(finish(habit, input.time, input.description))
}

fn finish(entry: Entry, time: Option<NaiveTime>, description: Option<&str>) -> Entry {
    let entry = match description {
        Some(description) => entry.with_description(description.trim()),
        None => entry,
    };
    match time {
        Some(time) => entry.with_time(time),
        None => entry,
    }
}

pub async fn run_add_task(input: NewTask<'_>, context: &CliContext) -> Result<(), CliError> {
    let task = build_task(&input, &SystemClock)?;
    save(&task, context).await
}

pub async fn run_add_habit(input: NewHabit<'_>, context: &CliContext) -> Result<(), CliError> {
    let habit = build_habit(&input, &SystemClock)?;
    save(&habit, context).await
}

async fn save(entry: &Entry, context: &CliContext) -> Result<(), CliError> {
    let repo = context.open_repository()?;
    let saved = repo.save_entry(entry).await?;
    println!("{}", saved.id);
    Ok(())
}
