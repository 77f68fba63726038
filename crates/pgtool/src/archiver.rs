//! Process-backed archiver driving `pg_dump` and `pg_restore`.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::{Credential, PASSWORD_ENV, PgtoolSettings};
use crate::ports::{ArchiveTarget, Archiver, ArchiverError};

/// Archiver that runs the PostgreSQL client programs as child processes.
#[derive(Debug, Clone)]
pub struct CommandArchiver {
    dump_program: OsString,
    restore_program: OsString,
    credential: Option<Credential>,
}

impl CommandArchiver {
    /// Build an archiver from explicit program names.
    pub fn new(
        dump_program: impl Into<OsString>,
        restore_program: impl Into<OsString>,
        credential: Option<Credential>,
    ) -> Self {
        Self {
            dump_program: dump_program.into(),
            restore_program: restore_program.into(),
            credential,
        }
    }

    /// Build an archiver from resolved settings.
    #[must_use]
    pub fn from_settings(settings: &PgtoolSettings, credential: Option<Credential>) -> Self {
        Self::new(
            settings.dump_program(),
            settings.restore_program(),
            credential,
        )
    }

    /// Arguments passed to the dump program.
    #[must_use]
    pub fn dump_args(target: &ArchiveTarget) -> Vec<OsString> {
        [
            "-U",
            target.user.as_str(),
            "-h",
            target.host.as_str(),
            "-Fc",
            target.database.as_str(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }

    /// Arguments passed to the restore program.
    #[must_use]
    pub fn restore_args(target: &ArchiveTarget, dump_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-U",
            target.user.as_str(),
            "-h",
            target.host.as_str(),
            "-d",
            target.database.as_str(),
            "--clean",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(dump_path.as_os_str().to_owned());
        args
    }

    fn command(&self, program: &OsStr, args: Vec<OsString>) -> Command {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        if let Some(credential) = &self.credential {
            command.env(PASSWORD_ENV, credential.expose());
        }
        command
    }

    fn run(program: &OsStr, command: &mut Command) -> Result<(), ArchiverError> {
        let label = program.to_string_lossy().into_owned();
        debug!(program = %label, "launching archiver");
        let status = command
            .status()
            .map_err(|error| ArchiverError::launch(label.as_str(), error.to_string()))?;
        if status.success() {
            return Ok(());
        }
        Err(ArchiverError::exited(label, status.to_string()))
    }
}

impl Default for CommandArchiver {
    fn default() -> Self {
        Self::from_settings(&PgtoolSettings::unconfigured(), None)
    }
}

impl Archiver for CommandArchiver {
    fn dump(
        &self,
        target: &ArchiveTarget,
        sink: File,
        diagnostics: File,
    ) -> Result<(), ArchiverError> {
        let mut command = self.command(&self.dump_program, Self::dump_args(target));
        command
            .stdout(Stdio::from(sink))
            .stderr(Stdio::from(diagnostics));
        Self::run(&self.dump_program, &mut command)
    }

    fn restore(
        &self,
        target: &ArchiveTarget,
        dump_path: &Path,
        diagnostics: File,
    ) -> Result<(), ArchiverError> {
        let mut command = self.command(
            &self.restore_program,
            Self::restore_args(target, dump_path),
        );
        command
            .stdout(Stdio::inherit())
            .stderr(Stdio::from(diagnostics));
        Self::run(&self.restore_program, &mut command)
    }
}
