use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tally_core::clock::Clock;
use tally_core::db::EntryStore;
use tally_core::models::{EntryKind, Recurrence, SyncConflict, SyncState};
use tally_core::sync::SyncSummary;
use tally_core::{Entry, EntryId};
use tempfile::TempDir;

use crate::cli::CompletionShell;
use crate::commands::add::{build_habit, build_task, NewHabit, NewTask};
use crate::commands::common::{
    entry_to_list_item, format_entry_lines, format_sync_conflict_lines, format_timestamp,
    match_entry_id, normalize_entry_identifier, normalize_title, resolve_entry, truncate,
    CliContext,
};
use crate::commands::completions::render_completions;
use crate::commands::delete::run_delete;
use crate::commands::done::run_done;
use crate::commands::sync::{format_sync_summary, run_sync, run_sync_watch};
use crate::config::{resolve_db_path, CliConfig};
use crate::error::CliError;

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn march_first() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn words(text: &str) -> Vec<String> {
    text.split(' ').map(str::to_string).collect()
}

fn test_context(dir: &TempDir) -> CliContext {
    CliContext {
        db_path: dir.path().join("tally.db"),
        config: CliConfig::default(),
        remote: None,
    }
}

async fn seed_task(context: &CliContext, id: &str, title: &str) -> Entry {
    let mut task = Entry::task(title, date(2026, 3, 1), 1_000);
    task.id = id.parse().unwrap();
    let repo = context.open_repository().unwrap();
    repo.save_entry(&task).await.unwrap()
}

#[test]
fn normalize_title_joins_words_and_rejects_blank() {
    assert_eq!(normalize_title(&words("Buy  oat milk")).unwrap(), "Buy oat milk");
    assert!(matches!(
        normalize_title(&words("   ")),
        Err(CliError::EmptyTitle)
    ));
    assert!(matches!(normalize_title(&[]), Err(CliError::EmptyTitle)));
}

#[test]
fn normalize_entry_identifier_rejects_empty() {
    assert_eq!(normalize_entry_identifier("  abc  ").unwrap(), "abc");
    assert!(matches!(
        normalize_entry_identifier(" \t"),
        Err(CliError::EmptyEntryId)
    ));
}

#[test]
fn build_task_defaults_due_date_to_today() {
    let clock = march_first();
    let title = words("Buy milk");
    let task = build_task(
        &NewTask {
            title: &title,
            due: None,
            time: None,
            description: Some("  two litres "),
        },
        &clock,
    )
    .unwrap();

    assert_eq!(task.kind, EntryKind::Task { due_date: date(2026, 3, 1) });
    assert_eq!(task.description, "two litres");
    assert_eq!(task.created_at, clock.now_millis());
    assert_eq!(task.sync_state, SyncState::Pending);
}

#[test]
fn build_habit_uses_explicit_start_and_recurrence() {
    let title = words("Stretch");
    let habit = build_habit(
        &NewHabit {
            title: &title,
            recurrence: Recurrence::Weekly,
            start: Some(date(2026, 2, 20)),
            time: None,
            description: None,
        },
        &march_first(),
    )
    .unwrap();

    assert_eq!(habit.recurrence(), Some(Recurrence::Weekly));
    match habit.kind {
        EntryKind::Habit { start_date, .. } => assert_eq!(start_date, date(2026, 2, 20)),
        EntryKind::Task { .. } => panic!("expected a habit"),
    }
}

#[test]
fn match_entry_id_supports_exact_prefix_and_reports_ambiguity() {
    let a: EntryId = "11111111-1111-7111-8111-111111111111".parse().unwrap();
    let b: EntryId = "11111111-1111-7111-8111-222222222222".parse().unwrap();
    let ids = [a.clone(), b.clone()];

    assert_eq!(match_entry_id(a.as_str(), &ids).unwrap(), a);
    assert_eq!(match_entry_id("11111111-1111-7111-8111-2", &ids).unwrap(), b);
    assert!(matches!(
        match_entry_id("11111111", &ids),
        Err(CliError::AmbiguousEntryId(_))
    ));
    assert!(matches!(
        match_entry_id("ffff", &ids),
        Err(CliError::EntryNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn resolve_entry_supports_exact_and_prefix_id() {
    let dir = TempDir::new().unwrap();
    let context = test_context(&dir);
    seed_task(&context, "aaaaaaaa-aaaa-7aaa-8aaa-111111111111", "Left").await;
    seed_task(&context, "aaaaaaaa-aaaa-7aaa-8aaa-222222222222", "Right").await;
    let repo = context.open_repository().unwrap();

    let by_exact = resolve_entry("aaaaaaaa-aaaa-7aaa-8aaa-111111111111", &repo)
        .await
        .unwrap();
    assert_eq!(by_exact.title, "Left");

    let by_prefix = resolve_entry("aaaaaaaa-aaaa-7aaa-8aaa-2", &repo)
        .await
        .unwrap();
    assert_eq!(by_prefix.title, "Right");

    let error = resolve_entry("aaaaaaaa", &repo).await.unwrap_err();
    assert!(matches!(error, CliError::AmbiguousEntryId(_)));

    let error = resolve_entry("does-not-exist", &repo).await.unwrap_err();
    assert!(matches!(error, CliError::EntryNotFound(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_delete_removes_entry_and_queues_deletion() {
    let dir = TempDir::new().unwrap();
    let context = test_context(&dir);
    let keep = seed_task(&context, "bbbbbbbb-bbbb-7bbb-8bbb-111111111111", "Keep me").await;
    let gone = seed_task(&context, "bbbbbbbb-bbbb-7bbb-8bbb-222222222222", "Delete me").await;

    run_delete("bbbbbbbb-bbbb-7bbb-8bbb-2", &context)
        .await
        .unwrap();

    let repo = context.open_repository().unwrap();
    assert!(repo.get_entry(&gone.id).await.unwrap().is_none());
    assert!(repo.get_entry(&keep.id).await.unwrap().is_some());
    let pending = repo.deletions(SyncState::Pending).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, gone.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn run_done_toggles_completion_for_the_given_day() {
    let dir = TempDir::new().unwrap();
    let context = test_context(&dir);
    let mut habit = Entry::habit("Stretch", Recurrence::Daily, date(2026, 2, 1), 1_000);
    habit.id = "cccccccc-cccc-7ccc-8ccc-111111111111".parse().unwrap();
    context
        .open_repository()
        .unwrap()
        .save_entry(&habit)
        .await
        .unwrap();

    run_done("cccccccc", Some(date(2026, 3, 1)), true, &context)
        .await
        .unwrap();
    let repo = context.open_repository().unwrap();
    assert_eq!(repo.done_history(&habit.id).await.unwrap().len(), 1);

    run_done("cccccccc", Some(date(2026, 3, 1)), false, &context)
        .await
        .unwrap();
    assert!(repo.done_history(&habit.id).await.unwrap().is_empty());
    let stored = repo.get_entry(&habit.id).await.unwrap().unwrap();
    assert!(!stored.is_done);
    assert_eq!(stored.sync_state, SyncState::Pending);
}

#[tokio::test(flavor = "multi_thread")]
async fn local_writes_stay_pending_without_a_remote() {
    let dir = TempDir::new().unwrap();
    let context = test_context(&dir);
    let task = seed_task(&context, "dddddddd-dddd-7ddd-8ddd-111111111111", "Offline").await;

    let repo = context.open_repository().unwrap();
    let pending = repo
        .engine()
        .store()
        .get_all_by_state(SyncState::Pending)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, task.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn run_sync_requires_remote_configuration() {
    let dir = TempDir::new().unwrap();
    let context = test_context(&dir);

    let error = run_sync(&context).await.unwrap_err();
    assert!(matches!(error, CliError::SyncNotConfigured));

    let error = run_sync_watch(Some(5), &context).await.unwrap_err();
    assert!(matches!(error, CliError::SyncNotConfigured));
}

#[test]
fn load_config_defaults_when_file_is_missing() {
    let dir = TempDir::new().unwrap();
    let config = CliConfig::load_from_path(&dir.path().join("missing.json")).unwrap();
    assert_eq!(config, CliConfig::default());
}

#[test]
fn load_config_rejects_unknown_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"remote_url":"https://x.example","colour":"blue"}"#).unwrap();

    let error = CliConfig::load_from_path(&path).unwrap_err();
    assert!(matches!(error, CliError::Config { .. }));
}

#[test]
fn remote_config_prefers_environment_over_file() {
    let config = CliConfig {
        remote_url: Some("https://file.example/".to_string()),
        remote_token: Some("file-token".to_string()),
        remote_collection: Some("habits".to_string()),
        ..CliConfig::default()
    };

    let from_file = config.remote_config(|_| None).unwrap().unwrap();
    assert_eq!(from_file.base_url(), "https://file.example");
    assert_eq!(from_file.collection(), "habits");

    let from_env = config
        .remote_config(|key| match key {
            "TALLY_REMOTE_URL" => Some("https://env.example".to_string()),
            "TALLY_REMOTE_TIMEOUT_SECS" => Some("3".to_string()),
            _ => None,
        })
        .unwrap()
        .unwrap();
    assert_eq!(from_env.base_url(), "https://env.example");
    assert_eq!(from_env.api_token(), "file-token");
    assert_eq!(from_env.timeout(), Duration::from_secs(3));
}

#[test]
fn remote_config_is_absent_without_url() {
    let config = CliConfig::default();
    assert!(config.remote_config(|_| None).unwrap().is_none());
}

#[test]
fn remote_config_requires_token_with_url() {
    let config = CliConfig {
        remote_url: Some("https://file.example".to_string()),
        ..CliConfig::default()
    };
    assert!(matches!(
        config.remote_config(|_| None),
        Err(CliError::Core(_))
    ));
}

#[test]
fn sync_settings_flag_overrides_file_and_ignores_zero() {
    let config = CliConfig {
        sync_interval_secs: Some(120),
        ..CliConfig::default()
    };

    assert_eq!(config.sync_settings(None).interval, Duration::from_secs(120));
    assert_eq!(config.sync_settings(Some(15)).interval, Duration::from_secs(15));
    assert_eq!(
        CliConfig::default().sync_settings(Some(0)).interval,
        Duration::from_secs(60)
    );
}

#[test]
fn resolve_db_path_prefers_flag_then_env_then_file() {
    let config = CliConfig {
        db_path: Some(PathBuf::from("/file/tally.db")),
        ..CliConfig::default()
    };
    let flag = Some(PathBuf::from("/flag/tally.db"));
    let env = Some(PathBuf::from("/env/tally.db"));

    assert_eq!(
        resolve_db_path(flag, env.clone(), &config),
        Path::new("/flag/tally.db")
    );
    assert_eq!(
        resolve_db_path(None, env, &config),
        Path::new("/env/tally.db")
    );
    assert_eq!(
        resolve_db_path(None, None, &config),
        Path::new("/file/tally.db")
    );
    assert!(resolve_db_path(None, None, &CliConfig::default()).ends_with("tally/tally.db"));
}

#[test]
fn format_entry_lines_show_state_and_detail() {
    let mut task = Entry::task("Buy milk", date(2026, 3, 1), 1_000);
    task.id = "eeeeeeee-eeee-7eee-8eee-111111111111".parse().unwrap();
    task.is_done = true;

    let lines = format_entry_lines(&[task.clone()]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("eeeeeeee-eeee"));
    assert!(lines[0].contains("[x]"));
    assert!(lines[0].contains("due 2026-03-01"));
    assert!(lines[0].ends_with("pending"));

    let item = entry_to_list_item(&task);
    assert_eq!(item.entry_type, "task");
    assert_eq!(item.due_date, Some(date(2026, 3, 1)));
    assert_eq!(item.recurrence, None);
}

#[test]
fn truncate_collapses_whitespace_and_adds_ellipsis() {
    assert_eq!(truncate("a  b\nc", 10), "a b c");
    assert_eq!(truncate("abcdefghij", 6), "abc...");
}

#[test]
fn format_timestamp_returns_utc_label() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_sync_conflict_lines_include_key_fields() {
    let conflict = SyncConflict {
        id: 1,
        entry_id: "entry-1".to_string(),
        local_updated_at: 200,
        incoming_updated_at: 150,
        resolved_at: 0,
        strategy: "lww".to_string(),
    };

    let lines = format_sync_conflict_lines(&[conflict]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("entry=entry-1"));
    assert!(lines[0].contains("local=200"));
    assert!(lines[0].contains("incoming=150"));
    assert!(lines[0].contains("lww"));
}

#[test]
fn format_sync_summary_reports_counts() {
    let lines = format_sync_summary(&SyncSummary::default());
    assert_eq!(
        lines,
        vec![
            "Pushed 0 (0 retrying, 0 failed)".to_string(),
            "Pulled 0 (0 stale, 0 deleted locally, 0 invalid)".to_string(),
        ]
    );
}

#[test]
fn render_completions_targets_tally_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("_tally()"));
    assert!(script.contains("complete -F _tally"));
}
