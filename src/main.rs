//! # Racemap Logger
//!
//! Poll a Racemap event and append each starter's telemetry to a text log.

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use racemap_logger::config::Config;
use racemap_logger::poller::{HttpTrackerSource, Poller};
use racemap_logger::shutdown;
use racemap_logger::telemetry::extractor::Extractor;
use racemap_logger::telemetry::sink::FileSink;

/// Environment variable overriding the configuration file location
const CONFIG_ENV_VAR: &str = "RACEMAP_LOGGER_CONFIG";

/// Configuration file read when the environment variable is unset
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Build the log filter from `RUST_LOG`-style directives, INFO when empty
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

/// Main entry point for Racemap Logger
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up timestamped logging to stderr
///    - Load configuration (built-in defaults if the file is missing)
///    - Create the log directory
///
/// 2. **Main Loop**
///    - Poll the tracker every period, retrying failed fetches
///    - Append one line per starter to `<log_dir>/<Name>.txt`
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C interrupts the current retry delay or period sleep
///
/// # Errors
///
/// Returns error if the configuration is invalid or the log directory
/// cannot be created. Nothing that happens inside the poll loop is fatal.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(log_filter(&std::env::var("RUST_LOG").unwrap_or_default()))
        .init();

    info!("Racemap Logger v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    let sink = FileSink::new(&config.output.log_dir);
    sink.ensure_dir()
        .with_context(|| format!("failed to create log directory {}", sink.dir().display()))?;
    info!("Writing starter logs to {}", sink.dir().display());

    let source = HttpTrackerSource::new(&config.api)?;
    info!("Polling {}", source.url());

    let extractor = Extractor::new(config.extract.offset()?);
    let mut poller = Poller::new(source, sink, extractor, &config.schedule);

    let (trigger, listener) = shutdown::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down...");
                trigger.trigger();
            }
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let cycles = poller.run(listener).await;
    info!("Total cycles run: {}", cycles);

    Ok(())
}
