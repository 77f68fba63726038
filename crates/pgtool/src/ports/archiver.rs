//! Driven port for the external dump producer and dump loader.
//!
//! Implementations block until the underlying work has finished; nothing
//! outlives a call to [`Archiver::dump`] or [`Archiver::restore`].

use std::fs::File;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

/// Database coordinates handed to the archiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTarget {
    /// Database to dump or restore into.
    pub database: String,
    /// Role used to connect.
    pub user: String,
    /// Server host name or socket directory.
    pub host: String,
}

/// Errors raised while running the external archiver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiverError {
    /// The program could not be started.
    #[error("failed to launch '{program}': {message}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Description of the launch failure.
        message: String,
    },
    /// The program ran but reported failure.
    #[error("'{program}' failed with {status}")]
    Exited {
        /// Program that exited unsuccessfully.
        program: String,
        /// Exit status description.
        status: String,
    },
    /// The dump could not be written or the payload could not be read.
    #[error("archive stream failed: {message}")]
    Stream {
        /// Description of the stream failure.
        message: String,
    },
}

impl ArchiverError {
    /// Build a [`ArchiverError::Launch`] error.
    pub fn launch(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Launch {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Build an [`ArchiverError::Exited`] error.
    pub fn exited(program: impl Into<String>, status: impl Into<String>) -> Self {
        Self::Exited {
            program: program.into(),
            status: status.into(),
        }
    }

    /// Build an [`ArchiverError::Stream`] error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }
}

/// Port for producing and loading database dumps.
#[cfg_attr(test, mockall::automock)]
pub trait Archiver: Send + Sync {
    /// Dump `target` into `sink`.
    ///
    /// `diagnostics` receives anything the archiver reports on its error
    /// stream; the pipelines pass a handle onto the operation log.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError`] when the dump cannot be started or does not
    /// complete successfully. The caller owns cleanup of `sink`.
    fn dump(
        &self,
        target: &ArchiveTarget,
        sink: File,
        diagnostics: File,
    ) -> Result<(), ArchiverError>;

    /// Load the uncompressed dump at `dump_path` into `target`, replacing
    /// existing objects.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError`] when the restore cannot be started or does
    /// not complete successfully.
    fn restore(
        &self,
        target: &ArchiveTarget,
        dump_path: &Path,
        diagnostics: File,
    ) -> Result<(), ArchiverError>;
}

/// Fixture archiver that writes a fixed payload and accepts every restore.
///
/// # Examples
///
/// ```
/// use pgtool::ports::{Archiver, ArchiveTarget, FixtureArchiver};
///
/// let dir = tempfile::tempdir().expect("temp dir");
/// let sink = std::fs::File::create(dir.path().join("db.dump")).expect("sink");
/// let diagnostics = std::fs::File::create(dir.path().join("log")).expect("log");
/// let target = ArchiveTarget {
///     database: "db".to_owned(),
///     user: "postgres".to_owned(),
///     host: "localhost".to_owned(),
/// };
///
/// FixtureArchiver::default()
///     .dump(&target, sink, diagnostics)
///     .expect("fixture dump succeeds");
/// assert_eq!(
///     std::fs::read(dir.path().join("db.dump")).expect("read dump"),
///     FixtureArchiver::PAYLOAD
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureArchiver;

impl FixtureArchiver {
    /// Bytes written by every fixture dump.
    pub const PAYLOAD: &'static [u8] = b"PGDMP fixture payload\n";
}

impl Archiver for FixtureArchiver {
    fn dump(
        &self,
        _target: &ArchiveTarget,
        mut sink: File,
        _diagnostics: File,
    ) -> Result<(), ArchiverError> {
        sink.write_all(Self::PAYLOAD)
            .and_then(|()| sink.flush())
            .map_err(|error| ArchiverError::stream(error.to_string()))
    }

    fn restore(
        &self,
        _target: &ArchiveTarget,
        _dump_path: &Path,
        _diagnostics: File,
    ) -> Result<(), ArchiverError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for archiver error formatting.

    use super::*;

    #[test]
    fn launch_errors_name_the_program() {
        let err = ArchiverError::launch("pg_dump", "No such file or directory (os error 2)");
        assert_eq!(
            err.to_string(),
            "failed to launch 'pg_dump': No such file or directory (os error 2)"
        );
    }

    #[test]
    fn exit_errors_carry_the_status() {
        let err = ArchiverError::exited("pg_restore", "exit status: 1");
        assert_eq!(err.to_string(), "'pg_restore' failed with exit status: 1");
    }

    #[test]
    fn stream_errors_describe_the_failure() {
        let err = ArchiverError::stream("broken pipe");
        assert_eq!(err.to_string(), "archive stream failed: broken pipe");
    }
}
