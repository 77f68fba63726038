//! In-memory archiver recording what the pipelines ask of it.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use pgtool::ports::{ArchiveTarget, Archiver, ArchiverError};

#[derive(Default)]
struct Calls {
    launches: usize,
    restored: Vec<(String, Vec<u8>)>,
}

pub struct RecordingArchiver {
    payload: Vec<u8>,
    failure: Option<ArchiverError>,
    calls: Mutex<Calls>,
}

impl RecordingArchiver {
    /// Archiver whose dumps contain `payload`.
    pub fn new(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            failure: None,
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Archiver that writes a partial dump and then reports `failure`.
    pub fn failing(failure: ArchiverError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(b"PGDMP partial")
        }
    }

    /// Number of dump and restore calls made so far.
    pub fn launches(&self) -> usize {
        self.lock().launches
    }

    /// Database names and payloads handed to `restore`.
    pub fn restored(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().restored.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().expect("archiver call record")
    }

    fn outcome(&self) -> Result<(), ArchiverError> {
        self.failure.clone().map_or(Ok(()), Err)
    }
}

impl Archiver for RecordingArchiver {
    fn dump(
        &self,
        _target: &ArchiveTarget,
        mut sink: File,
        mut diagnostics: File,
    ) -> Result<(), ArchiverError> {
        self.lock().launches += 1;
        sink.write_all(&self.payload)
            .map_err(|error| ArchiverError::stream(error.to_string()))?;
        if self.failure.is_some() {
            writeln!(diagnostics, "pg_dump: error: connection to server failed")
                .map_err(|error| ArchiverError::stream(error.to_string()))?;
        }
        self.outcome()
    }

    fn restore(
        &self,
        target: &ArchiveTarget,
        dump_path: &Path,
        _diagnostics: File,
    ) -> Result<(), ArchiverError> {
        let payload =
            fs::read(dump_path).map_err(|error| ArchiverError::stream(error.to_string()))?;
        let mut calls = self.lock();
        calls.launches += 1;
        calls.restored.push((target.database.clone(), payload));
        drop(calls);
        self.outcome()
    }
}
