//! Error taxonomy for the backup and restore pipelines.
//!
//! Every variant's `Display` output is the short operator-facing line the CLI
//! prints to standard output. Detail for the stages that run after the log
//! file is open lives in the log, and in the `source` chain.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ports::ArchiverError;

/// Which pipeline an archiver failure interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// The dump half of a backup run.
    Backup,
    /// The load half of a restore run.
    Restore,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup => f.write_str("Backup"),
            Self::Restore => f.write_str("Restore"),
        }
    }
}

/// Which direction of the codec failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecStage {
    /// Compressing a fresh dump into an artifact.
    Compression,
    /// Decompressing an artifact into a restore payload.
    Decompression,
}

impl fmt::Display for CodecStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compression => f.write_str("Compression"),
            Self::Decompression => f.write_str("Decompression"),
        }
    }
}

/// Failures surfaced by the backup and restore pipelines.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `backup` was invoked without a database name.
    #[error("Error: Database name is required.")]
    MissingDatabase,

    /// `restore` was invoked without a database name or backup file.
    #[error("Error: Database name and backup file are required.")]
    MissingRestoreInputs,

    /// The configured backup directory does not exist.
    #[error("Error: Backup directory '{}' not found.", .path.display())]
    BackupDirNotFound {
        /// Directory that was looked up.
        path: PathBuf,
    },

    /// The backup directory exists but cannot be opened as a directory.
    #[error("Error: Cannot open backup directory '{}': {source}", .path.display())]
    BackupDirUnavailable {
        /// Directory that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The restore input does not carry the `.gz` suffix.
    #[error("Error: Backup file '{}' must end with '.gz'.", .path.display())]
    UnsupportedArtifact {
        /// Path supplied for restore.
        path: PathBuf,
    },

    /// The operation log could not be opened.
    #[error("Error: Cannot open log file '{}': {source}", .path.display())]
    LogFile {
        /// Log file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A backup launched in the same second already produced this file.
    #[error("Error: Backup file '{}' already exists.", .path.display())]
    ArtifactExists {
        /// The colliding dump or artifact path.
        path: PathBuf,
    },

    /// The intermediate dump file could not be created.
    #[error("Backup failed.")]
    DumpFile {
        /// Dump path that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The external archiver could not be launched or exited unsuccessfully.
    #[error("{stage} failed. Check log for details.")]
    Archiver {
        /// Pipeline the archiver ran in.
        stage: PipelineStage,
        /// Archiver failure.
        #[source]
        source: ArchiverError,
    },

    /// Compressing or decompressing an artifact failed.
    #[error("{stage} failed.")]
    Codec {
        /// Direction of the failed transform.
        stage: CodecStage,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    pub(crate) fn log_file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LogFile {
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn codec(stage: CodecStage, source: io::Error) -> Self {
        Self::Codec { stage, source }
    }

    /// Whether the error was raised before any file or process was touched.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingDatabase
                | Self::MissingRestoreInputs
                | Self::BackupDirNotFound { .. }
                | Self::UnsupportedArtifact { .. }
        )
    }
}
