//! Retention sweep for expired backup artifacts.
//!
//! The sweep walks the backup directory tree and deletes every regular file
//! with a `gz` extension whose modification time is strictly before the
//! cutoff. It is best-effort: each deletion is logged on its own and a
//! failure never stops the walk.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::fs::Dir;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::naming::has_compressed_extension;
use crate::oplog::OperationLog;

/// Paths touched by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Artifacts that were deleted.
    pub deleted: Vec<PathBuf>,
    /// Expired artifacts that could not be deleted.
    pub failed: Vec<PathBuf>,
}

/// Moment before which artifacts are expired.
///
/// A retention reaching past the earliest representable instant yields that
/// instant, so nothing expires.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use pgtool::retention::retention_cutoff;
///
/// let now = Utc
///     .with_ymd_and_hms(2026, 2, 24, 0, 0, 0)
///     .single()
///     .expect("valid timestamp");
/// assert_eq!(retention_cutoff(now, 7), now - Duration::days(7));
/// ```
#[must_use]
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(retention_days))
        .and_then(|retention| now.checked_sub_signed(retention))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Delete expired artifacts below `dir`.
///
/// `root` is the path `dir` was opened from and is only used to report full
/// paths in the log and the returned [`SweepReport`].
#[must_use]
pub fn sweep_expired_artifacts(
    dir: &Dir,
    root: &Path,
    cutoff: DateTime<Utc>,
    log: &OperationLog,
) -> SweepReport {
    let mut report = SweepReport::default();
    sweep_directory(dir, root, cutoff, log, &mut report);
    debug!(
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        "retention sweep finished"
    );
    report
}

fn sweep_directory(
    dir: &Dir,
    display_path: &Path,
    cutoff: DateTime<Utc>,
    log: &OperationLog,
    report: &mut SweepReport,
) {
    let entries = match dir.entries() {
        Ok(entries) => entries,
        Err(error) => {
            log.warning(format_args!(
                "Failed to read {}: {error}",
                display_path.display()
            ));
            return;
        }
    };

    for entry_result in entries {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(error) => {
                log.warning(format_args!(
                    "Failed to read {}: {error}",
                    display_path.display()
                ));
                continue;
            }
        };
        let name = PathBuf::from(entry.file_name());
        let path = display_path.join(&name);

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(error) => {
                log.warning(format_args!("Failed to inspect {}: {error}", path.display()));
                continue;
            }
        };

        if file_type.is_dir() {
            entry.open_dir().map_or_else(
                |error| log.warning(format_args!("Failed to read {}: {error}", path.display())),
                |child| sweep_directory(&child, &path, cutoff, log, report),
            );
            continue;
        }

        if !file_type.is_file() || !has_compressed_extension(&name) {
            continue;
        }

        match is_expired(&entry, cutoff) {
            Ok(false) => {}
            Ok(true) => match dir.remove_file(&name) {
                Ok(()) => {
                    log.info(format_args!("Deleted old backup: {}", path.display()));
                    report.deleted.push(path);
                }
                Err(error) => {
                    log.warning(format_args!(
                        "Failed to delete {}: {error}",
                        path.display()
                    ));
                    report.failed.push(path);
                }
            },
            Err(error) => {
                log.warning(format_args!("Failed to inspect {}: {error}", path.display()));
            }
        }
    }
}

fn is_expired(entry: &cap_std::fs::DirEntry, cutoff: DateTime<Utc>) -> io::Result<bool> {
    let modified = entry.metadata()?.modified()?.into_std();
    Ok(DateTime::<Utc>::from(modified) < cutoff)
}
