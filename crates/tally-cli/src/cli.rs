use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use tally_core::models::Recurrence;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Track tasks and habits from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a task or habit
    #[command(alias = "new")]
    Add {
        #[command(subcommand)]
        kind: AddCommands,
    },
    /// List entries visible on a day (today by default)
    List {
        /// Day to show (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all tasks
    Tasks {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all habits
    Habits {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one entry with its completion history
    Show {
        /// Entry ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark an entry done
    Done {
        /// Entry ID or unique ID prefix
        id: String,
        /// Day the completion applies to (today by default)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },
    /// Remove a completion
    Undone {
        /// Entry ID or unique ID prefix
        id: String,
        /// Day to clear (today by default)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },
    /// Delete an entry
    Delete {
        /// Entry ID or unique ID prefix
        id: String,
    },
    /// Sync local entries with the remote store
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
        /// Keep running and sync on an interval until interrupted
        #[arg(long)]
        watch: bool,
        /// Seconds between syncs in watch mode
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// Show pending and failed changes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Queue a failed entry or deletion for another sync attempt
    Retry {
        /// Entry ID or unique ID prefix
        id: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum AddCommands {
    /// Create a task due on a day
    Task {
        /// Task title
        title: Vec<String>,
        /// Due date (today by default)
        #[arg(long, value_name = "DATE")]
        due: Option<NaiveDate>,
        /// Reminder time of day (HH:MM:SS)
        #[arg(long, value_name = "TIME")]
        time: Option<NaiveTime>,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Create a recurring habit
    Habit {
        /// Habit title
        title: Vec<String>,
        /// How often the habit repeats
        #[arg(long, value_enum, default_value_t = RecurrenceArg::Daily)]
        recurrence: RecurrenceArg,
        /// First day of the habit (today by default)
        #[arg(long, value_name = "DATE")]
        start: Option<NaiveDate>,
        /// Reminder time of day (HH:MM:SS)
        #[arg(long, value_name = "TIME")]
        time: Option<NaiveTime>,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List recently rejected incoming changes
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RecurrenceArg {
    Daily,
    Weekly,
    Custom,
    None,
}

impl From<RecurrenceArg> for Recurrence {
    fn from(value: RecurrenceArg) -> Self {
        match value {
            RecurrenceArg::Daily => Self::Daily,
            RecurrenceArg::Weekly => Self::Weekly,
            RecurrenceArg::Custom => Self::Custom,
            RecurrenceArg::None => Self::None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
