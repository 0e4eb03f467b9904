//! Heartwise: heart disease risk prediction
//!
//! Main entry point for the command-line host.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartwise::adapters::sanitize::SanitizingMakeWriter;
use heartwise::cli::{self, Cli};
use heartwise::config::{log_directive, LogMode, DEFAULT_LOG_LEVEL};
use heartwise::HeartwiseError;

fn init_logging(level: Option<&str>) -> Result<WorkerGuard> {
    // Logs never go to stdout: results are written there.
    let (writer, guard) = match LogMode::from_env() {
        LogMode::File(path) => {
            if let Some(parent) = path.parent() {
                // Best-effort: a missing directory shows up as an open error below.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {path:?}"))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(log_directive(level, rust_log.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn run(cli: &Cli) -> Result<i32> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Heartwise...");
    let mut stdout = std::io::stdout().lock();
    let code = cli::execute(cli, &mut stdout)?;
    Ok(code)
}

fn main() {
    let cli = Cli::parse();

    let guard = match init_logging(cli.log_level.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            process::exit(1);
        }
    };

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Command failed: {e:#}");
            eprintln!("Error: {e:#}");
            e.downcast_ref::<HeartwiseError>()
                .map_or(1, HeartwiseError::exit_code)
        }
    };

    // Flush buffered log lines before exiting.
    drop(guard);
    process::exit(exit_code);
}
