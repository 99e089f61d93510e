//! Microrag CLI
//!
//! Guarded question answering over your documents.

use anyhow::Result;
use clap::Parser;
use microrag_core::error::exit_codes;
use microrag_core::{Config, MicroRagError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.downcast_ref::<MicroRagError>()
                .map(MicroRagError::exit_code)
                .unwrap_or(exit_codes::GENERAL_ERROR)
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let _guard = init_tracing(&config, cli.verbose)?;

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, &config).await,
        Commands::Ask(args) => commands::ask::run(args, &config, cli.format).await,
        Commands::Check(args) => commands::check::run(args, &config, cli.format).await,
        Commands::Config(args) => commands::config::run(args, &config, cli.format).await,
    }
}

/// Human-readable stderr logging, plus daily JSON files when `logging.dir` is set
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(config: &Config, verbose: bool) -> Result<Option<WorkerGuard>> {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let (json_layer, guard) = match config.logging.dir {
        Some(ref dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("microrag")
                .filename_suffix("log")
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}
