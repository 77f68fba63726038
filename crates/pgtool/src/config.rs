//! Configuration for backup and restore runs.
//!
//! Values resolve in three layers: built-in defaults, `PGTOOL_*` settings
//! loaded through OrthoConfig, and finally command-line flags. The resolved
//! [`BackupConfig`] and [`RestoreConfig`] are immutable and handed to the
//! pipelines explicitly.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::ports::ArchiveTarget;

/// Environment variable carrying the database password.
pub const PASSWORD_ENV: &str = "PGPASSWORD";

const DEFAULT_USER: &str = "postgres";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_BACKUP_DIR: &str = "/var/backups/postgresql";
const DEFAULT_LOG_FILE: &str = "/var/log/postgres_backup.log";
const DEFAULT_RETENTION_DAYS: u32 = 7;
const DEFAULT_DUMP_PROGRAM: &str = "pg_dump";
const DEFAULT_RESTORE_PROGRAM: &str = "pg_restore";

/// Site-wide defaults loaded from `PGTOOL_*` variables and config files.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PGTOOL")]
pub struct PgtoolSettings {
    /// Default database role.
    pub user: Option<String>,
    /// Default database host.
    pub host: Option<String>,
    /// Default directory holding backup artifacts.
    pub backup_dir: Option<PathBuf>,
    /// Default operation log path.
    pub log_file: Option<PathBuf>,
    /// Default retention period in days.
    pub retention_days: Option<u32>,
    /// Program used to produce dumps.
    pub dump_program: Option<String>,
    /// Program used to load dumps.
    pub restore_program: Option<String>,
}

impl PgtoolSettings {
    /// Settings with nothing configured; every accessor yields its default.
    #[must_use]
    pub const fn unconfigured() -> Self {
        Self {
            user: None,
            host: None,
            backup_dir: None,
            log_file: None,
            retention_days: None,
            dump_program: None,
            restore_program: None,
        }
    }

    /// Return the configured role, falling back to `postgres`.
    #[must_use]
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_USER)
    }

    /// Return the configured host, falling back to `localhost`.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Return the configured backup directory.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR))
    }

    /// Return the configured log file path.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }

    /// Return the configured retention period, falling back to seven days.
    #[must_use]
    pub fn retention_days(&self) -> u32 {
        self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    /// Return the dump program, falling back to `pg_dump`.
    #[must_use]
    pub fn dump_program(&self) -> OsString {
        OsString::from(self.dump_program.as_deref().unwrap_or(DEFAULT_DUMP_PROGRAM))
    }

    /// Return the restore program, falling back to `pg_restore`.
    #[must_use]
    pub fn restore_program(&self) -> OsString {
        OsString::from(
            self.restore_program
                .as_deref()
                .unwrap_or(DEFAULT_RESTORE_PROGRAM),
        )
    }
}

/// Connection coordinates shared by both pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Database role.
    pub user: String,
    /// Database host.
    pub host: String,
}

impl ConnectionSettings {
    /// Archiver coordinates for `database`.
    #[must_use]
    pub fn target(&self, database: &str) -> ArchiveTarget {
        ArchiveTarget {
            database: database.to_owned(),
            user: self.user.clone(),
            host: self.host.clone(),
        }
    }
}

/// Resolved configuration for one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Database to dump. Validated as non-empty by the pipeline.
    pub database: String,
    /// Connection coordinates.
    pub connection: ConnectionSettings,
    /// Existing directory receiving the artifact.
    pub backup_dir: PathBuf,
    /// Operation log path.
    pub log_file: PathBuf,
    /// Artifacts older than this many days are swept after the backup.
    pub retention_days: u32,
}

/// Resolved configuration for one restore run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreConfig {
    /// Database to restore into. Validated as non-empty by the pipeline.
    pub database: String,
    /// Compressed artifact to restore from. Validated as non-empty.
    pub artifact: PathBuf,
    /// Connection coordinates.
    pub connection: ConnectionSettings,
    /// Operation log path.
    pub log_file: PathBuf,
}

/// Database password propagated to the archiver environment.
///
/// The value is zeroed on drop and never rendered by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    /// Wrap a password.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Read [`PASSWORD_ENV`] from the process environment.
    ///
    /// Returns `None` when the variable is unset, empty, or not valid UTF-8.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        env::var(PASSWORD_ENV)
            .ok()
            .filter(|secret| !secret.is_empty())
            .map(Self::new)
    }

    /// Borrow the secret for handing to a child process environment.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
