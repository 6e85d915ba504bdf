//! Logging setup and configuration.

use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;
use crate::error::AppError;

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "fa_search_bot=info";
const LOG_FILE_PREFIX: &str = "fa-search-bot";
const MAX_LOG_FILES: usize = 7;

/// Sets up logging to stdout and to daily rotated files under `LOGS_PATH`.
///
/// `log` macros used across the crate are picked up by the subscriber.
pub fn setup_logging(config: &Config) -> Result<(), AppError> {
    let file_writer = file_writer(config)?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout).with_ansi(true))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()
        .map_err(|e| AppError::ConfigurationError {
            msg: format!("Failed to install log subscriber: {e}"),
        })
}

fn file_writer(config: &Config) -> Result<NonBlocking, AppError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&config.logs_path)
        .map_err(|e| AppError::ConfigurationError {
            msg: format!(
                "Failed to initialize rolling file appender at '{}': {e}",
                config.logs_path.display()
            ),
        })?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Flushes on drop, so it has to live as long as the process.
    std::mem::forget(guard);
    Ok(writer)
}
