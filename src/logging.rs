//! Tracing subscriber for the `photobatch` binary.
//!
//! Events go to the systemd journal when one is reachable. Everywhere else
//! they are appended to `photobatch.log`, rotated daily.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FILTER_ENV: &str = "PHOTOBATCH_LOG";
const LOG_FILE: &str = "photobatch.log";

/// Keeps the file writer thread alive for the life of the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where [`init`] ended up sending events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Journald,
    File(PathBuf),
}

/// Install the global subscriber.
///
/// The filter comes from `PHOTOBATCH_LOG` (any `EnvFilter` directive, so
/// `debug` or `photobatch::batch=trace` both work) and is `info` when unset.
/// `log_dir` only matters for the file target and defaults to
/// [`default_log_dir`]. Fails if a global subscriber is already set.
pub fn init(log_dir: Option<PathBuf>) -> Result<LogTarget> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(journald) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(journald)
                .try_init()?;
            tracing::debug!("Logging to journald");
            return Ok(LogTarget::Journald);
        }
    }

    let dir = log_dir.unwrap_or_else(default_log_dir);
    let writer = file_writer(&dir)?;
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;
    tracing::debug!("Logging to {:?}", dir.join(LOG_FILE));
    Ok(LogTarget::File(dir))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// `$XDG_DATA_HOME/photobatch/logs` or the platform equivalent.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photobatch")
        .join("logs")
}

fn file_writer(dir: &Path) -> Result<NonBlocking> {
    std::fs::create_dir_all(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE));
    // A second init keeps the first guard; its subscriber install fails anyway.
    let _ = FILE_GUARD.set(guard);
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_log_dir() {
        assert!(default_log_dir().ends_with("photobatch/logs"));
    }

    #[test]
    fn test_file_writer_creates_directory() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("a").join("logs");
        file_writer(&logs).unwrap();
        assert!(logs.is_dir());
    }
}
