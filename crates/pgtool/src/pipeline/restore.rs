//! Restore pipeline: decompress an artifact and load it.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use mockable::Clock;
use tracing::debug;

use super::{announce, has_database};
use crate::codec::decompress_file;
use crate::config::RestoreConfig;
use crate::error::{CodecStage, PipelineError, PipelineStage};
use crate::naming::restore_payload_path;
use crate::paths::containing_dir;
use crate::oplog::OperationLog;
use crate::ports::Archiver;

/// Runs the restore pipeline against an [`Archiver`].
pub struct RestoreService<A> {
    archiver: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<A> RestoreService<A> {
    /// Create a service using `archiver` for loads and `clock` for log stamps.
    pub const fn new(archiver: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self { archiver, clock }
    }
}

/// Removes the decompressed payload when the restore finishes.
struct TemporaryPayload<'a> {
    dir: &'a Dir,
    name: &'a Path,
    display_path: &'a Path,
    log: &'a OperationLog,
}

impl Drop for TemporaryPayload<'_> {
    fn drop(&mut self) {
        match self.dir.remove_file(self.name) {
            Ok(()) => debug!(payload = %self.display_path.display(), "removed restore payload"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => self.log.warning(format_args!(
                "Failed to remove temporary file {}: {error}",
                self.display_path.display()
            )),
        }
    }
}

impl<A> RestoreService<A>
where
    A: Archiver,
{
    /// Decompress `config.artifact` next to itself and load it into
    /// `config.database`.
    ///
    /// The decompressed payload is removed on every path once this run has
    /// written it; a file already sitting at the payload path survives an
    /// unreadable artifact. Progress lines are written to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for the first stage that fails. Validation
    /// failures are raised before any file is opened; later failures are
    /// also recorded in the operation log.
    pub fn run(&self, config: &RestoreConfig, out: &mut dyn Write) -> Result<(), PipelineError> {
        if !has_database(&config.database) || config.artifact.as_os_str().is_empty() {
            return Err(PipelineError::MissingRestoreInputs);
        }
        let artifact = config.artifact.as_path();
        let unsupported = || PipelineError::UnsupportedArtifact {
            path: artifact.to_path_buf(),
        };
        let payload_path = restore_payload_path(artifact).ok_or_else(unsupported)?;
        let (Some(artifact_file), Some(payload_file)) =
            (artifact.file_name(), payload_path.file_name())
        else {
            return Err(unsupported());
        };
        let artifact_name = Path::new(artifact_file);
        let payload_name = Path::new(payload_file);
        let log = OperationLog::open(&config.log_file, Arc::clone(&self.clock))?;

        let database = config.database.as_str();
        log.info(format_args!(
            "Starting restore for database '{database}' from '{}'.",
            artifact.display()
        ));
        announce(
            out,
            format_args!(
                "Restoring database '{database}' from '{}'...",
                artifact.display()
            ),
        );

        let dir = Dir::open_ambient_dir(containing_dir(artifact), ambient_authority())
            .map_err(|source| decompression_failed(&log, source))?;
        decompress_file(&dir, artifact_name, payload_name)
            .map_err(|source| decompression_failed(&log, source))?;
        let _payload = TemporaryPayload {
            dir: &dir,
            name: payload_name,
            display_path: &payload_path,
            log: &log,
        };

        let diagnostics = log.diagnostics()?;
        let target = config.connection.target(database);
        debug!(payload = %payload_path.display(), "running archiver restore");
        if let Err(source) = self.archiver.restore(&target, &payload_path, diagnostics) {
            log.error(format_args!("Restore failed: {source}"));
            return Err(PipelineError::Archiver {
                stage: PipelineStage::Restore,
                source,
            });
        }

        log.success(format_args!("Restore completed for database '{database}'."));
        announce(out, "Restore completed successfully.");
        Ok(())
    }
}

fn decompression_failed(log: &OperationLog, source: io::Error) -> PipelineError {
    log.error(format_args!("Decompression failed: {source}"));
    PipelineError::codec(CodecStage::Decompression, source)
}

#[cfg(test)]
#[path = "restore_tests.rs"]
mod tests;
