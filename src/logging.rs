//! Logging setup
//!
//! Console output by default. In debug mode, logs also go to daily rolling
//! files through a non-blocking writer; keep the returned guard alive for the
//! lifetime of the process so buffered lines are flushed.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "wastore.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    debug_mode: bool,
    log_dir: Option<PathBuf>,
    level: String,
    json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            debug_mode: false,
            log_dir: None,
            level: "info".to_string(),
            json: false,
        }
    }

    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Directive used when `RUST_LOG` is not set.
    fn default_directive(&self) -> String {
        if self.debug_mode {
            "wastore=debug,sqlx=warn,info".to_string()
        } else {
            format!("wastore={},sqlx=warn,warn", self.level)
        }
    }

    fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(default_log_dir)
    }

    /// Delete rolled log files older than `days` from the directory this
    /// config writes to.
    pub fn cleanup_old_logs(&self, days: u64) -> Result<usize> {
        cleanup_logs_in(&self.log_dir(), days)
    }
}

/// Default log directory: <data dir>/wastore/logs
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wastore")
        .join("logs")
}

/// Install the global subscriber. Returns the file writer guard in debug mode.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let (file_writer, guard) = if config.debug_mode {
        let dir = config.log_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
        let appender = RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(writer), Some(guard))
    } else {
        (None, None)
    };

    let console_plain = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr).with_target(true));
    let console_json = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_plain)
        .with(console_json)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Delete rolled log files older than `days` from `dir`. Returns how many
/// were removed.
pub fn cleanup_logs_in(dir: &Path, days: u64) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let max_age = Duration::from_secs(days * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
        if !is_log || !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {:?}", path))?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new()
            .with_debug_mode(true)
            .with_log_dir(PathBuf::from("/tmp/wastore-logs"))
            .with_level("warn")
            .with_json(true);
        assert!(config.debug_mode);
        assert!(config.json);
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/wastore-logs"));
        assert!(config.default_directive().contains("wastore=debug"));
    }

    #[test]
    fn test_default_directive_uses_level() {
        let config = LogConfig::new().with_level("trace");
        assert!(config.default_directive().starts_with("wastore=trace"));
    }

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wastore.log.2026-01-01"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        // Nothing is older than a day yet
        assert_eq!(cleanup_logs_in(dir.path(), 1).unwrap(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_cleanup_uses_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("wastore.log.2026-01-01");
        std::fs::write(&stale, "x").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(10 * 24 * 60 * 60))
            .unwrap();
        std::fs::write(dir.path().join("wastore.log.2026-10-16"), "x").unwrap();

        let config = LogConfig::new().with_log_dir(dir.path().to_path_buf());
        assert_eq!(config.cleanup_old_logs(7).unwrap(), 1);
        assert!(!stale.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_logs_in(&dir.path().join("absent"), 7).unwrap(), 0);
    }
}
