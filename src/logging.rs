use crate::config;
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILTER_ENV: &str = "MUSIKIPRI_LOG";
const LOG_FILE_PREFIX: &str = "musikipri.log";

/// Sends tracing output to a daily rolling file under `log_dir`, since the
/// terminal belongs to the UI. Keep the guard alive until exit so buffered
/// lines get flushed.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    config::ensure_dir(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install log subscriber")?;
    Ok(guard)
}
