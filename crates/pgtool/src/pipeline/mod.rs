//! Backup and restore pipelines.
//!
//! Each pipeline is a short sequence of stages that runs to completion or
//! stops at the first failing stage. Operator lines go to the caller's
//! writer; detail goes to the operation log.

mod backup;
mod restore;

use std::fmt;
use std::io::Write;

use tracing::warn;

pub use backup::{BackupOutcome, BackupService};
pub use restore::RestoreService;

pub(crate) fn announce(out: &mut dyn Write, line: impl fmt::Display) {
    if let Err(error) = writeln!(out, "{line}") {
        warn!(error = %error, "failed to write operator output");
    }
}

fn has_database(database: &str) -> bool {
    !database.trim().is_empty()
}
