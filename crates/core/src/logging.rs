//! Process-wide logger setup for hosts embedding the farm data layer.
//!
//! The library itself only emits through the `log` facade, using a stable
//! `event=… module=… status=…` message layout. Hosts call [`init_logging`]
//! once to route those records to stderr or to rotating files.
//!
//! # Invariants
//! - Initialization happens at most once per process.
//! - Repeating the call with the same level and destination is a no-op.
//! - A call with a different level or destination is rejected.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

const LOG_FILE_BASENAME: &str = "farm-data";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    log_dir: Option<PathBuf>,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn ensure_same(&self, level: &'static str, log_dir: Option<&Path>) -> Result<(), CoreError> {
        if self.level != level {
            return Err(CoreError::Logging(format!(
                "already initialized with level `{}`, cannot switch to `{level}`",
                self.level
            )));
        }
        if self.log_dir.as_deref() != log_dir {
            return Err(CoreError::Logging(format!(
                "already initialized with destination `{}`, cannot switch to `{}`",
                describe(self.log_dir.as_deref()),
                describe(log_dir)
            )));
        }
        Ok(())
    }
}

/// Start the logger. `log_dir = None` logs to stderr; otherwise size-rotated
/// files are written into that directory (created if missing).
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<(), CoreError> {
    let level = parse_level(level)?;
    if let Some(dir) = log_dir {
        if dir.as_os_str().is_empty() {
            return Err(CoreError::Logging("log directory must not be empty".into()));
        }
    }

    if let Some(active) = LOGGER.get() {
        return active.ensure_same(level, log_dir);
    }

    let active = LOGGER.get_or_try_init(|| start_logger(level, log_dir))?;
    active.ensure_same(level, log_dir)
}

/// `(level, log_dir)` of the running logger, if any.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    LOGGER
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

fn start_logger(level: &'static str, log_dir: Option<&Path>) -> Result<ActiveLogger, CoreError> {
    let logger = Logger::try_with_str(level)
        .map_err(|e| CoreError::Logging(format!("invalid level `{level}`: {e}")))?;

    let handle = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                CoreError::Logging(format!("cannot create `{}`: {e}", dir.display()))
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        }
        None => logger
            .log_to_stderr()
            .format(flexi_logger::detailed_format)
            .start(),
    }
    .map_err(|e| CoreError::Logging(format!("cannot start logger: {e}")))?;

    info!(
        "event=logging_init module=logging status=ok level={level} destination={} version={}",
        describe(log_dir),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.map(Path::to_path_buf),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<&'static str, CoreError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(CoreError::Logging(format!(
            "unsupported level `{other}`, expected trace|debug|info|warn|error"
        ))),
    }
}

fn describe(log_dir: Option<&Path>) -> String {
    log_dir
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "stderr".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_normalizes_case_and_aliases() {
        assert_eq!(parse_level(" INFO ").unwrap(), "info");
        assert_eq!(parse_level("Warning").unwrap(), "warn");
        assert!(matches!(parse_level("loud"), Err(CoreError::Logging(_))));
    }

    #[test]
    fn empty_directory_is_rejected_before_init() {
        let err = init_logging("info", Some(Path::new(""))).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    // The logger is process-global, so every init scenario lives in one test.
    #[test]
    fn init_is_idempotent_and_rejects_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");

        init_logging("info", Some(&logs)).unwrap();
        init_logging("INFO", Some(&logs)).unwrap();
        assert!(logs.is_dir());

        let level_err = init_logging("debug", Some(&logs)).unwrap_err();
        assert!(level_err.to_string().contains("cannot switch"));

        let dest_err = init_logging("info", None).unwrap_err();
        assert!(dest_err.to_string().contains("stderr"));

        let (level, active_dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(active_dir.as_deref(), Some(logs.as_path()));
    }
}
