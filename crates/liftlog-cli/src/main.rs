//! Liftlog - an offline workout tracker for the terminal.
//!
//! Exercises and history live in SQLite; workouts live in a JSON slot
//! mirrored by an in-memory store. Every command runs against one
//! initialized `App` and settles its writes before exiting.

mod app;
mod cli;
mod commands;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liftlog_core::{BuildError, Config};

use app::App;
use cli::{Cli, Commands};

/// Log file written inside the data directory
const LOG_FILE: &str = "liftlog.log";

/// Initialize the tracing subscriber for logging.
///
/// Stderr gets the `RUST_LOG` filter (default `warn`). When the data
/// directory is writable, the same events also go to a log file there.
fn init_tracing(data_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::fs::create_dir_all(data_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(data_dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn resolve_data_dir(cli: &Cli, config: &Config) -> Result<PathBuf> {
    match &cli.data_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => config.data_dir(),
    }
}

async fn run(cli: Cli, config: Config, data_dir: PathBuf) -> Result<()> {
    if let Commands::Config { unit, store_dir } = cli.command {
        return commands::config(config, unit, store_dir);
    }

    let mut app = App::new(config, data_dir)?;
    app.initialize().await?;

    let result = match cli.command {
        Commands::Config { .. } => Ok(()),
        Commands::Exercise(command) => commands::exercise(&mut app, command),
        Commands::Workout(command) => commands::workout(&mut app, command),
        Commands::Log {
            workout,
            sets,
            date,
        } => commands::log(&mut app, &workout, &sets, date),
        Commands::History(command) => commands::history(&mut app, command),
    };

    // Writes queued before a failing step still get settled
    let settled = app.settle().await;
    result.and(settled)
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<BuildError>() {
        Some(build) if build.is_not_found() => {
            eprintln!("{}", build);
            eprintln!("It may have been deleted. Run `liftlog workout list` or `liftlog exercise list` to see what exists.");
        }
        _ => eprintln!("Error: {:#}", err),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let data_dir = match resolve_data_dir(&cli, &config) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_tracing(&data_dir);
    info!(data_dir = ?data_dir, "Liftlog starting");

    match run(cli, config, data_dir).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}
