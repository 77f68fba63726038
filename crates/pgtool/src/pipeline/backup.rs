//! Backup pipeline: dump, compress, and sweep expired artifacts.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::ambient_authority;
use cap_std::fs::{Dir, OpenOptions};
use mockable::Clock;
use tracing::debug;

use super::{announce, has_database};
use crate::codec::compress_file;
use crate::config::BackupConfig;
use crate::error::{CodecStage, PipelineError, PipelineStage};
use crate::naming::ArtifactName;
use crate::oplog::OperationLog;
use crate::ports::Archiver;
use crate::retention::{SweepReport, retention_cutoff, sweep_expired_artifacts};

/// Result of a successful backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    /// Path of the compressed artifact.
    pub artifact: PathBuf,
    /// What the retention sweep removed.
    pub sweep: SweepReport,
}

/// Runs the backup pipeline against an [`Archiver`].
pub struct BackupService<A> {
    archiver: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<A> BackupService<A> {
    /// Create a service using `archiver` for dumps and `clock` for naming,
    /// log stamps, and the retention cutoff.
    pub const fn new(archiver: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self { archiver, clock }
    }
}

struct Workspace<'a> {
    dir: &'a Dir,
    root: &'a Path,
    log: &'a OperationLog,
}

impl Workspace<'_> {
    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn discard(&self, name: &str) {
        match self.dir.remove_file(name) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => self.log.warning(format_args!(
                "Failed to remove {}: {error}",
                self.path_of(name).display()
            )),
        }
    }
}

impl<A> BackupService<A>
where
    A: Archiver,
{
    /// Dump `config.database`, compress the dump, and sweep expired artifacts.
    ///
    /// Progress lines are written to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for the first stage that fails. Validation
    /// failures are raised before any file is opened; later failures are
    /// also recorded in the operation log.
    pub fn run(
        &self,
        config: &BackupConfig,
        out: &mut dyn Write,
    ) -> Result<BackupOutcome, PipelineError> {
        if !has_database(&config.database) {
            return Err(PipelineError::MissingDatabase);
        }
        let dir = open_backup_dir(&config.backup_dir)?;
        let log = OperationLog::open(&config.log_file, Arc::clone(&self.clock))?;
        let workspace = Workspace {
            dir: &dir,
            root: &config.backup_dir,
            log: &log,
        };

        let database = config.database.as_str();
        log.info(format_args!("Starting backup for database '{database}'."));
        announce(out, format_args!("Starting backup for database '{database}'..."));

        let name = ArtifactName::new(database, &self.clock.local());
        let artifact = self.produce_artifact(&workspace, config, &name)?;

        log.success(format_args!("Backup completed. File: {}", artifact.display()));
        announce(out, format_args!("Backup successful: {}", artifact.display()));

        let sweep = self.sweep(&workspace, config.retention_days, out);
        Ok(BackupOutcome { artifact, sweep })
    }

    fn produce_artifact(
        &self,
        workspace: &Workspace<'_>,
        config: &BackupConfig,
        name: &ArtifactName,
    ) -> Result<PathBuf, PipelineError> {
        let dump_name = name.dump_file_name();
        let artifact_name = name.artifact_file_name();
        let dump_path = workspace.path_of(dump_name);
        let artifact_path = workspace.path_of(&artifact_name);

        if workspace.dir.exists(&artifact_name) {
            return Err(collision(workspace.log, artifact_path));
        }
        let diagnostics = workspace.log.diagnostics()?;
        let sink = create_dump(workspace, dump_name, &dump_path)?;

        debug!(dump = %dump_path.display(), "running archiver dump");
        let target = config.connection.target(&config.database);
        if let Err(source) = self.archiver.dump(&target, sink, diagnostics) {
            workspace.log.error(format_args!("Backup failed: {source}"));
            workspace.discard(dump_name);
            return Err(PipelineError::Archiver {
                stage: PipelineStage::Backup,
                source,
            });
        }

        if let Err(source) = compress_file(
            workspace.dir,
            Path::new(dump_name),
            Path::new(&artifact_name),
        ) {
            workspace
                .log
                .error(format_args!("Compression failed: {source}"));
            workspace.discard(&artifact_name);
            workspace.log.warning(format_args!(
                "Uncompressed dump retained at {}",
                dump_path.display()
            ));
            return Err(PipelineError::codec(CodecStage::Compression, source));
        }
        workspace.discard(dump_name);
        Ok(artifact_path)
    }

    fn sweep(
        &self,
        workspace: &Workspace<'_>,
        retention_days: u32,
        out: &mut dyn Write,
    ) -> SweepReport {
        workspace.log.info(format_args!(
            "Cleaning up backups older than {retention_days} days."
        ));
        announce(out, "Cleaning up old backups...");

        let cutoff = retention_cutoff(self.clock.utc(), retention_days);
        let report = sweep_expired_artifacts(workspace.dir, workspace.root, cutoff, workspace.log);

        workspace.log.success("Cleanup complete.");
        announce(out, "Cleanup complete.");
        report
    }
}

fn open_backup_dir(path: &Path) -> Result<Dir, PipelineError> {
    Dir::open_ambient_dir(path, ambient_authority()).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            PipelineError::BackupDirNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PipelineError::BackupDirUnavailable {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn create_dump(
    workspace: &Workspace<'_>,
    dump_name: &str,
    dump_path: &Path,
) -> Result<std::fs::File, PipelineError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    match workspace.dir.open_with(dump_name, &options) {
        Ok(file) => Ok(file.into_std()),
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
            Err(collision(workspace.log, dump_path.to_path_buf()))
        }
        Err(source) => {
            workspace
                .log
                .error(format_args!("Cannot create backup file: {source}"));
            Err(PipelineError::DumpFile {
                path: dump_path.to_path_buf(),
                source,
            })
        }
    }
}

fn collision(log: &OperationLog, path: PathBuf) -> PipelineError {
    log.error(format_args!(
        "Backup file '{}' already exists.",
        path.display()
    ));
    PipelineError::ArtifactExists { path }
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
