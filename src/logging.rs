//! Tracing setup: stdout always, plus a daily-rolling file sink when
//! `ENABLE_FILE_LOGS` is set.

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::SERVICE_NAME;

/// Keeps the non-blocking file writer flushing until the process exits.
/// Dropping it early loses buffered log lines.
pub struct LogGuard {
    _file_writer: WorkerGuard,
}

pub fn init_tracing(log_level: &str) -> Option<LogGuard> {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match rolling_file_writer() {
        Some((writer, guard)) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true),
            ),
            Some(LogGuard {
                _file_writer: guard,
            }),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    guard
}

fn rolling_file_writer() -> Option<(NonBlocking, WorkerGuard)> {
    let enabled = std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);
    if !enabled {
        return None;
    }

    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        eprintln!("failed to create log directory {log_dir}: {err}");
        return None;
    }

    let appender =
        RollingFileAppender::new(Rotation::DAILY, &log_dir, format!("{SERVICE_NAME}.log"));
    Some(tracing_appender::non_blocking(appender))
}
