//! Tracing setup for the CLI.
//!
//! Human-readable lines go to stderr so stdout stays clean for event output.
//! A copy of everything goes to `fgws.log` in the log directory, rotated
//! daily, as plain text or JSON depending on `[logging] json_output`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::constants::LOG_FILE_NAME;
use crate::error::{FwsError, FwsResult};

/// Keeps the background log writer alive. Dropping it flushes the file.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _writer: WorkerGuard,
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level; `verbose` raises the
/// configured level to `debug`.
pub fn init_logging(settings: &LoggingConfig, log_dir: &Path, verbose: bool) -> FwsResult<LogGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => parse_filter(&filter_directive(&settings.level, verbose))?,
    };

    std::fs::create_dir_all(log_dir)?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_NAME));

    let file_layer = if settings.json_output {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_line_number(true)
            .boxed()
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| FwsError::Internal(format!("logging already initialized: {e}")))?;

    tracing::debug!("file logging to {}", log_dir.join(LOG_FILE_NAME).display());
    Ok(LogGuard { _writer: guard })
}

fn filter_directive(level: &str, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        level.trim().to_ascii_lowercase()
    }
}

fn parse_filter(directive: &str) -> FwsResult<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| FwsError::Config(format!("invalid log level {directive:?}: {e}")))
}
