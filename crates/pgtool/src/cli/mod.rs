//! Command-line surface: `pgtool backup` and `pgtool restore`.
//!
//! Flags are accepted in the single-dash long form (`-db orders`,
//! `-retention=14`) as well as the usual `--db orders`. Single-dash
//! arguments longer than one character are rewritten to the double-dash form
//! before clap sees them; `-h` keeps its short meaning.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::config::{BackupConfig, ConnectionSettings, PgtoolSettings, RestoreConfig};

/// One-line usage summary printed when no valid command is given.
pub const USAGE: &str = "Usage: pgtool <backup|restore> [options]";

const COMMANDS: [&str; 2] = ["backup", "restore"];

#[derive(Debug, Parser)]
#[command(
    name = "pgtool",
    about = "Compressed PostgreSQL backups with retention, and restores from them",
    version,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dump a database, compress the dump, and sweep expired artifacts.
    Backup(BackupArgs),
    /// Decompress an artifact and load it into a database.
    Restore(RestoreArgs),
}

/// Flags accepted by `pgtool backup`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct BackupArgs {
    /// Database name (required).
    #[arg(long = "db", value_name = "name")]
    pub db: Option<String>,
    /// PostgreSQL user.
    #[arg(long = "user", value_name = "user")]
    pub user: Option<String>,
    /// PostgreSQL host.
    #[arg(long = "host", value_name = "host")]
    pub host: Option<String>,
    /// Existing directory receiving the artifact.
    #[arg(long = "backup-dir", value_name = "dir")]
    pub backup_dir: Option<PathBuf>,
    /// Operation log path.
    #[arg(long = "log-file", value_name = "path")]
    pub log_file: Option<PathBuf>,
    /// Retention period in days.
    #[arg(long = "retention", value_name = "days")]
    pub retention: Option<u32>,
}

impl BackupArgs {
    /// Layer these flags over `settings`.
    #[must_use]
    pub fn into_config(self, settings: &PgtoolSettings) -> BackupConfig {
        BackupConfig {
            database: self.db.unwrap_or_default(),
            connection: connection(self.user, self.host, settings),
            backup_dir: self.backup_dir.unwrap_or_else(|| settings.backup_dir()),
            log_file: self.log_file.unwrap_or_else(|| settings.log_file()),
            retention_days: self.retention.unwrap_or_else(|| settings.retention_days()),
        }
    }
}

/// Flags accepted by `pgtool restore`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct RestoreArgs {
    /// Database name (required).
    #[arg(long = "db", value_name = "name")]
    pub db: Option<String>,
    /// Backup file (`.dump.gz`) to restore (required).
    #[arg(long = "file", value_name = "path")]
    pub file: Option<PathBuf>,
    /// PostgreSQL user.
    #[arg(long = "user", value_name = "user")]
    pub user: Option<String>,
    /// PostgreSQL host.
    #[arg(long = "host", value_name = "host")]
    pub host: Option<String>,
    /// Operation log path.
    #[arg(long = "log-file", value_name = "path")]
    pub log_file: Option<PathBuf>,
}

impl RestoreArgs {
    /// Layer these flags over `settings`.
    #[must_use]
    pub fn into_config(self, settings: &PgtoolSettings) -> RestoreConfig {
        RestoreConfig {
            database: self.db.unwrap_or_default(),
            artifact: self.file.unwrap_or_default(),
            connection: connection(self.user, self.host, settings),
            log_file: self.log_file.unwrap_or_else(|| settings.log_file()),
        }
    }
}

fn connection(
    user: Option<String>,
    host: Option<String>,
    settings: &PgtoolSettings,
) -> ConnectionSettings {
    ConnectionSettings {
        user: user.unwrap_or_else(|| settings.user().to_owned()),
        host: host.unwrap_or_else(|| settings.host().to_owned()),
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Run a backup.
    Backup(BackupArgs),
    /// Run a restore.
    Restore(RestoreArgs),
    /// Print the rendered help or version text and exit successfully.
    Help(String),
}

/// Command lines that cannot be dispatched.
///
/// `Display` renders the full operator output, usage line included.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    /// No command was given.
    #[error("{}", USAGE)]
    MissingCommand,
    /// The first argument is not a known command.
    #[error("Unknown command: {}\n{}", .name, USAGE)]
    UnknownCommand {
        /// The argument that was given as the command.
        name: String,
    },
    /// Flags were malformed, unknown, or missing values.
    #[error("{}\n{}", .message, USAGE)]
    InvalidArguments {
        /// Parser diagnostic.
        message: String,
    },
}

/// Parse a full argument vector, program name first.
///
/// # Errors
///
/// Returns [`CliError`] when no command, an unknown command, or malformed
/// flags were given.
///
/// # Examples
///
/// ```
/// use pgtool::cli::{Invocation, parse};
///
/// let invocation = parse(["pgtool", "backup", "-db", "orders", "-retention=14"])
///     .expect("arguments should parse");
/// let Invocation::Backup(args) = invocation else {
///     panic!("expected a backup invocation");
/// };
/// assert_eq!(args.db.as_deref(), Some("orders"));
/// assert_eq!(args.retention, Some(14));
/// ```
pub fn parse<I, T>(args: I) -> Result<Invocation, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let normalized = normalize_flags(args);
    if let Some(name) = normalized
        .get(1)
        .map(OsString::as_os_str)
        .and_then(unknown_command)
    {
        return Err(CliError::UnknownCommand { name });
    }

    match Cli::try_parse_from(normalized) {
        Ok(Cli {
            command: Some(Command::Backup(args)),
        }) => Ok(Invocation::Backup(args)),
        Ok(Cli {
            command: Some(Command::Restore(args)),
        }) => Ok(Invocation::Restore(args)),
        Ok(Cli { command: None }) => Err(CliError::MissingCommand),
        Err(error) => classify(&error),
    }
}

fn classify(error: &clap::Error) -> Result<Invocation, CliError> {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            Ok(Invocation::Help(error.render().to_string()))
        }
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => Err(CliError::MissingCommand),
        ErrorKind::InvalidSubcommand => match error.get(ContextKind::InvalidSubcommand) {
            Some(ContextValue::String(name)) => {
                Err(CliError::UnknownCommand { name: name.clone() })
            }
            _ => Err(invalid_arguments(error)),
        },
        _ => Err(invalid_arguments(error)),
    }
}

fn invalid_arguments(error: &clap::Error) -> CliError {
    CliError::InvalidArguments {
        message: error.render().to_string().trim_end().to_owned(),
    }
}

fn unknown_command(arg: &OsStr) -> Option<String> {
    let name = arg.to_string_lossy();
    if name.starts_with('-') || COMMANDS.contains(&&*name) {
        return None;
    }
    Some(name.into_owned())
}

/// Rewrite single-dash long flags into clap's double-dash form.
///
/// `-db` becomes `--db` and `-retention=3` becomes `--retention=3`.
/// Single-character flags such as `-h`, arguments that already use two
/// dashes, and everything after a bare `--` are left untouched.
///
/// # Examples
///
/// ```
/// use std::ffi::OsString;
/// use pgtool::cli::normalize_flags;
///
/// let args = normalize_flags(["pgtool", "backup", "-db", "orders", "-h"]);
/// assert_eq!(
///     args,
///     ["pgtool", "backup", "--db", "orders", "-h"].map(OsString::from)
/// );
/// ```
pub fn normalize_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(index, arg)| {
            if index == 0 || passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            promote_single_dash(arg)
        })
        .collect()
}

fn promote_single_dash(arg: OsString) -> OsString {
    let Some(text) = arg.to_str() else {
        return arg;
    };
    let Some(flag) = text.strip_prefix('-') else {
        return arg;
    };
    let name = flag.split_once('=').map_or(flag, |(name, _)| name);
    if flag.starts_with('-') || name.chars().count() < 2 {
        return arg;
    }
    OsString::from(format!("--{flag}"))
}
