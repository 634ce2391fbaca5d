#![forbid(unsafe_code)]

//! File logging. The terminal belongs to the UI, so nothing goes to stderr.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber writing to `<dir>/debug.log`. The returned
/// guard flushes the writer when dropped and must outlive the event loop.
pub fn init(dir: &Path, default_level: &str) -> anyhow::Result<WorkerGuard> {
    fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, "debug.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()?;

    tracing::info!(dir = %dir.display(), "logging initialized");
    Ok(guard)
}
