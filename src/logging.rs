//! Tracing setup for the binary.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "jikan-sync.log";

/// Build the filter: `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber.
///
/// Logs go to stderr unless a directory is configured, in which case they go
/// to a daily-rolling file there. The returned guard flushes the file writer
/// on drop and must be held for the life of the process.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
  let filter = env_filter(config);

  match &config.directory {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

      let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::registry()
        .with(filter)
        .with(
          fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true),
        )
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(
          fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false),
        )
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

      Ok(None)
    }
  }
}
