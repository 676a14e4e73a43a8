mod app;
mod domain;
mod logging;
mod persist;
mod store;
mod ui;
mod view;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;
use time::{Duration as TimeDuration, OffsetDateTime};

use app::{App, Command};
use domain::task::{TaskCollection, TaskId};
use persist::TaskStorage;
use store::KeyValueStore;
use store::memory::MemoryStore;
use store::sqlite::SqliteStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "tasklist: a small persistent todo list", long_about = None)]
struct Args {
    /// Tick interval of render loop in milliseconds
    #[arg(long, default_value_t = 120)]
    tick_ms: u64,

    /// Start with demo tasks in an in-memory store
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Use in-memory store instead of SQLite
    #[arg(long, default_value_t = false)]
    memory: bool,

    /// Path to SQLite store file (default: OS data dir)
    #[arg(long, env = "TASKLIST_STORE")]
    store: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error or off
    #[arg(long, env = "TASKLIST_LOG")]
    log_level: Option<String>,

    /// Directory for log files (default: OS data dir)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Add a task
    Add { text: String },
    /// Flip a task between open and completed
    Toggle { id: String },
    /// Remove a task
    Delete { id: String },
    /// Print tasks in display order
    List,
    /// Render the list as an HTML page
    Html {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Open the written file with the system viewer
        #[arg(long = "open", default_value_t = false, requires = "out")]
        open_file: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Keeps the file logger alive until exit.
    let _logger = start_logging(&args);

    let store: Box<dyn KeyValueStore> = if args.demo {
        Box::new(seeded_store()?)
    } else if args.memory {
        Box::new(MemoryStore::default())
    } else if let Some(path) = args.store.as_ref() {
        Box::new(SqliteStore::open(path)?)
    } else {
        Box::new(SqliteStore::open_default()?)
    };

    let mut app = App::new(store);
    match args.command {
        None => ui::run(app, Duration::from_millis(args.tick_ms)),
        Some(cmd) => {
            let res = run_command(&mut app, cmd);
            for notice in app.notices() {
                eprintln!("{}", notice.message);
            }
            res
        }
    }
}

fn start_logging(args: &Args) -> Option<flexi_logger::LoggerHandle> {
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| logging::default_log_level().to_string());
    let dir = match args.log_dir.clone() {
        Some(dir) => dir,
        None => match logging::default_log_dir() {
            Ok(dir) => dir,
            Err(err) => {
                eprintln!("logging disabled: {err:#}");
                return None;
            }
        },
    };
    match logging::init_logging(&level, &dir) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("logging disabled: {err:#}");
            None
        }
    }
}

fn run_command<S: KeyValueStore>(app: &mut App<S>, cmd: Cmd) -> Result<()> {
    match cmd {
        Cmd::Add { text } => {
            if !app.dispatch(Command::Add(text)) {
                bail!("task text must not be empty");
            }
            if let Some(task) = app.tasks().as_slice().last() {
                println!("{}", task.id());
            }
        }
        Cmd::Toggle { id } => {
            let id = TaskId::from(id);
            if !app.dispatch(Command::Toggle(id.clone())) {
                bail!("no task with id {id}");
            }
        }
        Cmd::Delete { id } => {
            let id = TaskId::from(id);
            if !app.dispatch(Command::Delete(id.clone())) {
                bail!("no task with id {id}");
            }
        }
        Cmd::List => {
            let view = app.view();
            if view.is_empty() {
                println!("No tasks yet.");
            }
            for row in &view.rows {
                let mark = if row.completed() { "x" } else { " " };
                println!("[{mark}] {}  {}", row.id(), row.text());
            }
            println!(
                "{} · {}",
                view.stats.total_label(),
                view.stats.completed_label()
            );
        }
        Cmd::Html { out, open_file } => {
            let html = view::html::render_document(&app.view());
            match out {
                Some(path) => {
                    std::fs::write(&path, html)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!("event=export_html status=ok path={}", path.display());
                    if open_file {
                        open::that(&path)
                            .with_context(|| format!("failed to open {}", path.display()))?;
                    }
                }
                None => print!("{html}"),
            }
        }
    }
    Ok(())
}

/// In-memory store pre-filled with a few sample tasks.
fn seeded_store() -> Result<MemoryStore> {
    let now = OffsetDateTime::now_utc();
    let mut tasks = TaskCollection::default();
    let samples = [
        ("Write documentation", 3),
        ("Check PRs waiting for review", 2),
        ("Draft release notes", 1),
    ];
    for (text, hours_ago) in samples {
        tasks.add_at(text, now - TimeDuration::hours(hours_ago));
    }
    if let Some(first) = tasks.as_slice().first().map(|t| t.id().clone()) {
        tasks.toggle(&first);
    }

    let mut storage = TaskStorage::new(MemoryStore::default());
    storage.save(&tasks).context("failed to seed demo tasks")?;
    Ok(storage.into_inner())
}
