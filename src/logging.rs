use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{fmt::time::UtcTime, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize logging: stdout plus an optional rolling file appender.
///
/// Level comes from `logging.level` if set, otherwise `RUST_LOG`, otherwise `info`.
/// The returned guard flushes the file writer on drop; hold it for the process lifetime.
pub fn init_with_config(cfg: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter = match &cfg.level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let (file_writer, guard) = if cfg.enable_file_logging {
        match open_file_writer(cfg) {
            Some((writer, guard)) => (Some(writer), Some(guard)),
            None => (None, None),
        }
    } else {
        (None, None)
    };

    match cfg.format {
        LogFormat::Json => {
            let stdout = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(std::io::stdout);
            let file = file_writer.map(|writer| {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(writer)
            });
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout)
                .with(file)
                .try_init();
        }
        LogFormat::Text => {
            let stdout = tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(std::io::stdout);
            let file = file_writer.map(|writer| {
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(writer)
            });
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout)
                .with(file)
                .try_init();
        }
    }

    guard
}

pub(crate) fn parse_rotation(raw: &str) -> Rotation {
    match raw.trim().to_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

fn open_file_writer(
    cfg: &LoggingConfig,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(&cfg.dir) {
        eprintln!(
            "Failed to create log directory '{}' ({err}), continuing with stdout logs",
            cfg.dir
        );
        return None;
    }

    let appender = tracing_appender::rolling::RollingFileAppender::new(
        parse_rotation(&cfg.rotation),
        &cfg.dir,
        &cfg.filename,
    );
    Some(tracing_appender::non_blocking(appender))
}
