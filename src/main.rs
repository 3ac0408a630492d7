//! promptlift - prompt enhancement for AI chat pages
//!
//! Command-line front end over the page engine. Pages are loaded from JSON
//! snapshots; storage, tab opening and the rewrite service go through the
//! background bridge.

mod cli;
mod commands;

use std::sync::OnceLock;

use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use promptlift_config::{ConfigLoader, LoggingConfig};

use crate::cli::{Cli, Commands};

/// Keeps the file writer alive for the program duration.
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize tracing with console output and, when configured, a daily
/// rolling log file (JSON lines when `logging.json` is set).
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let mut file_writer = None;
    if let Some(dir) = &logging.directory {
        std::fs::create_dir_all(dir)?;
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("promptlift")
            .filename_suffix("log")
            .max_log_files(14)
            .build(dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = GUARD.set(guard);
        file_writer = Some(non_blocking);
    }

    let (file_json, file_text) = match file_writer {
        Some(writer) if logging.json => (Some(fmt::layer().json().with_writer(writer)), None),
        Some(writer) => (None, Some(fmt::layer().with_writer(writer).with_ansi(false))),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // stderr, so stdout carries only command output
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(file_json)
        .with(file_text)
        .init();

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(&cli.config)?;
    init_tracing(&config.logging)?;
    info!("promptlift v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Platforms { format } => commands::platforms(&config, &format),
        Commands::Resolve { snapshot } => commands::resolve(&config, &snapshot).await,
        Commands::Enhance {
            snapshot,
            text,
            stream,
        } => commands::enhance(&config, &snapshot, text.as_deref(), stream).await,
        Commands::Open { platform, text } => commands::open(&config, &platform, &text).await,
        Commands::Deliver { snapshot } => commands::deliver(&config, &snapshot).await,
        Commands::Pending { clear } => commands::pending(&config, clear).await,
        Commands::Check => commands::check(&config),
    }
}
