// crates/app/src/main.rs
//! Taskboard CLI entry point (spec.md §6 "External interfaces").
//!
//! Parses the config document, resolves a bearer token from the
//! environment, and either runs a one-shot discovery/summary pass or
//! launches the full TUI with a background sync loop feeding it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use taskboard_core::paths;
use taskboard_core::Config;
use taskboard_coordinator::EditCoordinator;
use taskboard_coordinator::jobs::JobRunner;
use taskboard_db::{Database, Period};
use taskboard_remote::{discover_open_projects, GraphQlClient};
use taskboard_ui::Services;
use tracing_subscriber::EnvFilter;

const SYNC_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser, Debug)]
#[command(name = "taskboard", about = "A terminal workspace for GitHub Projects")]
struct Cli {
    /// Path to the configuration document (spec.md §6).
    #[arg(long)]
    config: PathBuf,

    /// Path to the SQLite database file.
    #[arg(long)]
    db: Option<PathBuf>,

    /// List open projects per configured owner, then exit.
    #[arg(long)]
    discover: bool,

    /// Print a summary of tracked tasks and recorded time, then exit.
    #[arg(long = "no-ui")]
    no_ui: bool,
}

#[tokio::main]
async fn main() {
    taskboard_app::env::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let db_path = cli.db.unwrap_or_else(paths::default_db_path);
    let db = match Database::new(&db_path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("failed to open database at {}: {e}", db_path.display());
            std::process::exit(2);
        }
    };

    let mock_fetch = taskboard_app::env::mock_fetch_enabled();
    let needs_network = cli.discover || !mock_fetch;

    let token = if needs_network {
        match taskboard_app::env::resolve_token() {
            Some(t) => Some(t),
            None => {
                eprintln!("missing GITHUB_TOKEN (or TOKEN) for a networked operation");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    if cli.discover {
        run_discover(&config, token.expect("checked above")).await;
        return;
    }

    if mock_fetch {
        let rows = taskboard_app::mock::mock_rows(&config);
        if let Err(e) = db.upsert_many(&rows).await {
            eprintln!("failed to seed mock rows: {e}");
            std::process::exit(2);
        }
        tracing::info!(rows = rows.len(), "seeded database from MOCK_FETCH rows");
    }

    if cli.no_ui {
        run_summary(&db).await;
        return;
    }

    let client = Arc::new(GraphQlClient::new(token.clone().unwrap_or_default()));
    let jobs = Arc::new(JobRunner::new());
    let coordinator = EditCoordinator::new(db.clone(), client.clone(), jobs);

    match db.load().await {
        Ok(tasks) => coordinator.set_tasks(tasks).await,
        Err(e) => eprintln!("failed to load initial tasks: {e}"),
    }

    let (trigger_tx, trigger_rx) = tokio::sync::mpsc::unbounded_channel();
    let sync_progress = if mock_fetch {
        // Nothing to sync against a real API in mock mode; the UI still
        // gets a receiver, it just never reports progress.
        let (_tx, rx) = tokio::sync::watch::channel(taskboard_ui::sync_progress::SyncProgress::default());
        rx
    } else {
        taskboard_app::sync_loop::spawn(
            client.clone(),
            db.clone(),
            Arc::new(config),
            coordinator.clone(),
            trigger_rx,
            SYNC_INTERVAL,
        )
    };

    let services = Services {
        coordinator,
        db: db.clone(),
        sync_progress,
        sync_trigger: trigger_tx,
    };

    if let Err(e) = taskboard_ui::run(services, paths::ui_state_path()).await {
        eprintln!("ui error: {e}");
        std::process::exit(2);
    }
}

async fn run_discover(config: &Config, token: String) {
    let client = GraphQlClient::new(token);
    for source in &config.projects {
        match discover_open_projects(&client, source.owner_type, &source.owner).await {
            Ok(projects) => {
                for p in projects {
                    println!("{}/{}  #{}  {}", source.owner_type.as_str(), source.owner, p.number, p.title);
                }
            }
            Err(e) => {
                eprintln!("discovery failed for {}: {e}", source.owner);
                std::process::exit(1);
            }
        }
    }
}

async fn run_summary(db: &Database) {
    let tasks = match db.load().await {
        Ok(t) => t,
        Err(e) => {
            eprintln!("failed to load tasks: {e}");
            std::process::exit(2);
        }
    };
    let open = tasks.iter().filter(|t| !t.is_done).count();
    let done = tasks.len() - open;
    println!("{} tracked tasks ({open} open, {done} done)", tasks.len());

    let now = chrono::Utc::now();
    match db.aggregate_period_totals(Period::Day, 7, None, None, now).await {
        Ok(totals) => {
            let total_seconds: i64 = totals.iter().map(|t| t.seconds).sum();
            println!(
                "last 7 days: {}h{:02}m tracked across {} day(s) with activity",
                total_seconds / 3600,
                (total_seconds % 3600) / 60,
                totals.len()
            );
        }
        Err(e) => eprintln!("failed to aggregate time totals: {e}"),
    }

    match db.all_sessions().await {
        Ok(sessions) => {
            if let Some(open_session) = sessions.iter().find(|s| s.is_open()) {
                println!("timer running on {}", open_session.task_url);
            }
        }
        Err(e) => eprintln!("failed to load sessions: {e}"),
    }
}
