//! Append-only operation log.
//!
//! Each record is a single line `<YYYY/MM/DD HH:MM:SS> <SEVERITY>: <message>`
//! stamped from the injected clock. The log never rotates and a failed write
//! never aborts a pipeline. Every record is mirrored as a `tracing` event.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::ambient_authority;
use cap_std::fs::{Dir, OpenOptions};
use mockable::Clock;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::paths::containing_dir;

/// `strftime` pattern for record timestamps.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Severity tag written in front of each message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress information.
    Info,
    /// A stage failed and the pipeline is aborting.
    Error,
    /// A pipeline or sweep finished.
    Success,
    /// A best-effort step failed and the pipeline continues.
    Warning,
}

impl Severity {
    /// Tag as written to the log file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle onto the operation log file.
pub struct OperationLog {
    file: File,
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for OperationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl OperationLog {
    /// Open `path` for appending, creating it when missing.
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LogFile`] when the parent directory or the
    /// file cannot be opened.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, PipelineError> {
        let file = open_append(path).map_err(|source| PipelineError::log_file(path, source))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            clock,
        })
    }

    /// Path the log was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an `INFO` record.
    pub fn info(&self, message: impl fmt::Display) {
        self.record(Severity::Info, message);
    }

    /// Append an `ERROR` record.
    pub fn error(&self, message: impl fmt::Display) {
        self.record(Severity::Error, message);
    }

    /// Append a `SUCCESS` record.
    pub fn success(&self, message: impl fmt::Display) {
        self.record(Severity::Success, message);
    }

    /// Append a `WARNING` record.
    pub fn warning(&self, message: impl fmt::Display) {
        self.record(Severity::Warning, message);
    }

    /// Append one record with the given severity.
    pub fn record(&self, severity: Severity, message: impl fmt::Display) {
        let message = message.to_string();
        match severity {
            Severity::Error => error!(severity = %severity, "{message}"),
            Severity::Warning => warn!(severity = %severity, "{message}"),
            Severity::Info | Severity::Success => info!(severity = %severity, "{message}"),
        }

        let timestamp = self.clock.local().format(LOG_TIMESTAMP_FORMAT);
        let line = format!("{timestamp} {severity}: {message}\n");
        if let Err(write_error) = (&self.file).write_all(line.as_bytes()) {
            warn!(
                path = %self.path.display(),
                error = %write_error,
                "operation log write failed"
            );
        }
    }

    /// Second handle onto the log, used as an archiver's error stream.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LogFile`] when the handle cannot be cloned.
    pub fn diagnostics(&self) -> Result<File, PipelineError> {
        self.file
            .try_clone()
            .map_err(|source| PipelineError::log_file(&self.path, source))
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path must be a file"))?;
    let directory = Dir::open_ambient_dir(containing_dir(path), ambient_authority())?;
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    let file = directory.open_with(Path::new(file_name), &options)?;
    Ok(file.into_std())
}
