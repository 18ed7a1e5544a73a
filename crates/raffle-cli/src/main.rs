// Raffle entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config
// 4. Open database, build the app
// 5. Run the command

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use raffle_app::{LlmSuggestions, RaffleApp};
use raffle_cli::cli::Cli;
use raffle_cli::commands;
use raffle_core::config;
use raffle_core::db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse arguments (clap prints help/usage and exits on its own)
    let cli = Cli::parse();

    // 2. Initialize tracing
    init_tracing()?;
    info!(command = ?cli.command, "raffle starting");

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!("Config loaded: database={}", config.db_path);

    // 4. Open database and build the app
    let db = Database::open(&config.db_path).context("failed to open database")?;
    let suggestions = LlmSuggestions::from_config(&config);
    if suggestions.is_active() {
        info!("LLM client initialized (API key configured)");
    } else {
        info!("LLM client disabled (no API key)");
    }
    let mut app = RaffleApp::new(config, db, suggestions);

    // 5. Run the command
    let mut stdout = std::io::stdout().lock();
    let outcome = commands::run(&mut app, cli.command, &mut stdout).await;
    stdout.flush()?;

    if let Err(e) = &outcome {
        error!("command failed: {e:#}");
    }
    outcome
}

const DEFAULT_LOG_FILTER: &str =
    "raffle=info,raffle_cli=info,raffle_core=info,raffle_app=info,raffle_llm=info,warn";

/// Log to `logs/raffle.log` so command output on stdout stays clean.
/// `RUST_LOG` overrides the default filter.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("raffle.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
