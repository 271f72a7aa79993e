//! Tracing setup: human-readable events on stderr plus a daily-rotated file.
//!
//! The filter comes from `RUST_LOG` and defaults to `info`.

use std::fs;

use anyhow::Context;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Builds the daily-rotated file appender, creating the log directory.
///
/// Only the newest `retention_files` files are kept.
pub fn file_appender(config: &LogConfig) -> anyhow::Result<RollingFileAppender> {
    let dir = config.resolved_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .max_log_files(config.retention_files)
        .build(&dir)
        .with_context(|| format!("open log file in {}", dir.display()))
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive for the life of the program; dropping it
/// flushes and stops the file writer.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<WorkerGuard> {
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(config)?);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("install tracing subscriber")?;
    Ok(guard)
}
