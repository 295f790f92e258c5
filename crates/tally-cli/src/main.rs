//! Tally CLI - tasks and habits from the terminal
//!
//! Every write lands in the local database first; `tally sync` pushes and
//! pulls when a remote is configured.

mod cli;
mod commands;
mod config;
mod error;
#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{AddCommands, Cli, Commands, SyncCommands};
use crate::commands::add::{run_add_habit, run_add_task, NewHabit, NewTask};
use crate::commands::common::CliContext;
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::done::run_done;
use crate::commands::list::{run_list, Listing};
use crate::commands::show::run_show;
use crate::commands::status::{run_retry, run_status};
use crate::commands::sync::{run_sync, run_sync_conflicts, run_sync_watch};
use crate::config::resolve_config_path;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "tally_core=info,tally=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let config_path = resolve_config_path(cli.config);
    let context = CliContext::resolve(cli.db_path, &config_path)?;

    match command {
        Commands::Add { kind } => match kind {
            AddCommands::Task {
                title,
                due,
                time,
                description,
            } => {
                let input = NewTask {
                    title: &title,
                    due,
                    time,
                    description: description.as_deref(),
                };
                run_add_task(input, &context).await?;
            }
            AddCommands::Habit {
                title,
                recurrence,
                start,
                time,
                description,
            } => {
                let input = NewHabit {
                    title: &title,
                    recurrence: recurrence.into(),
                    start,
                    time,
                    description: description.as_deref(),
                };
                run_add_habit(input, &context).await?;
            }
        },
        Commands::List { date, json } => run_list(Listing::Day(date), json, &context).await?,
        Commands::Tasks { json } => run_list(Listing::Tasks, json, &context).await?,
        Commands::Habits { json } => run_list(Listing::Habits, json, &context).await?,
        Commands::Show { id, json } => run_show(&id, json, &context).await?,
        Commands::Done { id, date } => run_done(&id, date, true, &context).await?,
        Commands::Undone { id, date } => run_done(&id, date, false, &context).await?,
        Commands::Delete { id } => run_delete(&id, &context).await?,
        Commands::Sync {
            command: Some(SyncCommands::Conflicts { limit, json }),
            ..
        } => run_sync_conflicts(limit, json, &context).await?,
        Commands::Sync {
            command: None,
            watch,
            interval,
        } => {
            if watch {
                run_sync_watch(interval, &context).await?;
            } else {
                run_sync(&context).await?;
            }
        }
        Commands::Status { json } => run_status(json, &context).await?,
        Commands::Retry { id } => run_retry(&id, &context).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
