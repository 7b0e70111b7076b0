//! Tracing subscriber setup for the front ends.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogConfig, paths};

/// Overrides the configured level, using `EnvFilter` directive syntax.
pub const LOG_ENV: &str = "AUDITPULSE_LOG";

fn filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber: stderr, or a daily file under the log
/// directory when `log.file` is set.
///
/// Keep the returned guard alive until exit so buffered file output is flushed.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a subscriber
/// is already installed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let registry = tracing_subscriber::registry().with(filter(config));

    match &config.file {
        Some(file) => {
            let dir = paths::log_dir();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, file));
            registry
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()
                .context("install tracing subscriber")?;
            Ok(Some(guard))
        }
        None => {
            registry
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .context("install tracing subscriber")?;
            Ok(None)
        }
    }
}
