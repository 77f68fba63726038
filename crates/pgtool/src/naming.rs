//! Artifact naming for backup runs.
//!
//! A backup run produces `<db>_<YYYY-MM-DD_HHMMSS>.dump` while the external
//! dump program writes, then `<db>_<YYYY-MM-DD_HHMMSS>.dump.gz` once the dump
//! has been compressed. Names have one-second resolution and the database
//! name is used verbatim as a path segment.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

/// Extension of the intermediate dump written by the external program.
pub const DUMP_EXTENSION: &str = "dump";

/// Extension of compressed artifacts, without the leading dot.
pub const COMPRESSED_EXTENSION: &str = "gz";

/// Suffix appended to a dump file name to form the artifact name.
pub const COMPRESSED_SUFFIX: &str = ".gz";

/// `strftime` pattern embedded in every artifact name.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// File names derived from one backup launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    dump_file_name: String,
}

impl ArtifactName {
    /// Build the names for a dump of `database` launched at `launched_at`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{FixedOffset, TimeZone};
    /// use pgtool::naming::ArtifactName;
    ///
    /// let offset = FixedOffset::east_opt(3600).expect("valid offset");
    /// let launched_at = offset
    ///     .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
    ///     .single()
    ///     .expect("valid timestamp");
    ///
    /// let name = ArtifactName::new("ledger", &launched_at);
    /// assert_eq!(name.dump_file_name(), "ledger_2026-01-02_030405.dump");
    /// ```
    #[must_use]
    pub fn new<Tz>(database: &str, launched_at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let timestamp = launched_at.format(TIMESTAMP_FORMAT);
        Self {
            dump_file_name: format!("{database}_{timestamp}.{DUMP_EXTENSION}"),
        }
    }

    /// Name of the intermediate, uncompressed dump.
    #[must_use]
    pub fn dump_file_name(&self) -> &str {
        &self.dump_file_name
    }

    /// Name of the compressed artifact.
    #[must_use]
    pub fn artifact_file_name(&self) -> String {
        format!("{}{COMPRESSED_SUFFIX}", self.dump_file_name)
    }
}

/// Full path of the intermediate dump for `database` under `backup_dir`.
///
/// The compressed artifact path is this value with `.gz` appended.
#[must_use]
pub fn backup_path<Tz>(backup_dir: &Path, database: &str, launched_at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    backup_dir.join(ArtifactName::new(database, launched_at).dump_file_name())
}

/// Append the compressed suffix to a dump path.
#[must_use]
pub fn compressed_path(dump_path: &Path) -> PathBuf {
    let mut raw = OsString::from(dump_path.as_os_str());
    raw.push(COMPRESSED_SUFFIX);
    PathBuf::from(raw)
}

/// Path of the temporary payload a restore decompresses into.
///
/// Returns `None` when `artifact` does not end in `.gz`; the suffix is
/// checked rather than stripped blindly.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use pgtool::naming::restore_payload_path;
///
/// assert_eq!(
///     restore_payload_path(Path::new("/backups/app_2026-01-02_030405.dump.gz")),
///     Some(PathBuf::from("/backups/app_2026-01-02_030405.dump")),
/// );
/// assert_eq!(restore_payload_path(Path::new("/backups/app.dump")), None);
/// ```
#[must_use]
pub fn restore_payload_path(artifact: &Path) -> Option<PathBuf> {
    let file_name = artifact.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(COMPRESSED_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(artifact.with_file_name(stem))
}

/// Whether `path` carries the compressed artifact extension.
#[must_use]
pub fn has_compressed_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == COMPRESSED_EXTENSION)
}
