//! Run logs for projection and catalog commands
//!
//! The console gets short lines on stderr so stdout stays clean for scene
//! summaries and folder listings. The daily file in `LOG_DIR` keeps the full
//! record with source locations, one file per day of projection runs.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when RUST_LOG is unset. HTTP client internals only show warnings.
const DEFAULT_FILTER: &str = "info,neuron_projector=debug,hyper=warn,hyper_util=warn,reqwest=warn";

const LOG_FILE_PREFIX: &str = "neuron_projector.log";

/// Install the console and file layers. Fails if a subscriber is already set.
pub fn init_logging(log_dir: &str) -> anyhow::Result<()> {
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        std::fs::create_dir_all(log_path)?;
    }

    // neuron_projector.log.YYYY-MM-DD
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_path, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    // dropping the guard would stop the writer thread before the last scene is logged
    std::mem::forget(guard);

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!("Run log: {:?}", log_path.join(LOG_FILE_PREFIX));
    Ok(())
}
