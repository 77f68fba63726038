//! Driven ports for the backup and restore pipelines.
//!
//! The pipelines only reach the external archival programs through these
//! traits, so tests can substitute in-memory fakes for real processes.

mod archiver;

#[cfg(test)]
pub use archiver::MockArchiver;
pub use archiver::{ArchiveTarget, Archiver, ArchiverError, FixtureArchiver};
