//! Compressed PostgreSQL backup and restore orchestration.
//!
//! `pgtool` drives the external `pg_dump` and `pg_restore` programs and owns
//! everything around them: artifact naming, gzip compression, the operation
//! log, and the retention sweep that expires old artifacts.
//!
//! # Overview
//!
//! - [`naming`] builds `<db>_<YYYY-MM-DD_HHMMSS>.dump` names from a clock
//!   reading.
//! - [`ports::Archiver`] is the boundary to the external programs;
//!   [`archiver::CommandArchiver`] is the process-backed adapter.
//! - [`codec`] streams files through gzip.
//! - [`retention`] deletes expired `.gz` artifacts.
//! - [`pipeline`] composes the stages into the backup and restore flows.
//! - [`app::App`] parses arguments and maps pipeline outcomes to exit
//!   statuses.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use pgtool::naming::ArtifactName;
//!
//! let launched_at = Utc
//!     .with_ymd_and_hms(2026, 2, 24, 10, 30, 5)
//!     .single()
//!     .expect("valid timestamp");
//! let name = ArtifactName::new("inventory", &launched_at);
//!
//! assert_eq!(name.dump_file_name(), "inventory_2026-02-24_103005.dump");
//! assert_eq!(name.artifact_file_name(), "inventory_2026-02-24_103005.dump.gz");
//! ```

pub mod app;
pub mod archiver;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod naming;
pub mod oplog;
mod paths;
pub mod pipeline;
pub mod ports;
pub mod retention;

#[cfg(test)]
mod test_support;

pub use app::{App, RunStatus};
pub use config::{BackupConfig, ConnectionSettings, Credential, PgtoolSettings, RestoreConfig};
pub use error::{CodecStage, PipelineError, PipelineStage};
