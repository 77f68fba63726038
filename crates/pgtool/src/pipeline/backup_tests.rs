//! Unit coverage for the backup pipeline.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::BackupService;
use crate::codec::decompress;
use crate::config::{BackupConfig, ConnectionSettings};
use crate::error::{CodecStage, PipelineError, PipelineStage};
use crate::ports::{ArchiverError, MockArchiver};
use crate::test_support::{FIXTURE_STAMP, fixture_clock, log_messages};

const DUMP_BYTES: &[u8] = b"PGDMP\x01\x0e\x00custom format body";

struct Scratch {
    temp: TempDir,
    config: BackupConfig,
}

impl Scratch {
    fn dump_path(&self) -> PathBuf {
        self.config
            .backup_dir
            .join(format!("orders_{FIXTURE_STAMP}.dump"))
    }

    fn artifact_path(&self) -> PathBuf {
        self.config
            .backup_dir
            .join(format!("orders_{FIXTURE_STAMP}.dump.gz"))
    }

    fn backup_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.config.backup_dir)
            .expect("list backup dir")
            .map(|entry| {
                entry
                    .expect("dir entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

#[fixture]
fn scratch() -> Scratch {
    let temp = tempfile::tempdir().expect("create temp dir");
    let backup_dir = temp.path().join("backups");
    fs::create_dir(&backup_dir).expect("create backup dir");
    let config = BackupConfig {
        database: "orders".to_owned(),
        connection: ConnectionSettings {
            user: "backup".to_owned(),
            host: "db.internal".to_owned(),
        },
        backup_dir,
        log_file: temp.path().join("pgtool.log"),
        retention_days: 7,
    };
    Scratch { temp, config }
}

fn service(archiver: MockArchiver) -> BackupService<MockArchiver> {
    BackupService::new(Arc::new(archiver), fixture_clock())
}

fn writing_archiver(payload: &'static [u8]) -> MockArchiver {
    let mut archiver = MockArchiver::new();
    archiver
        .expect_dump()
        .withf(|target, _, _| {
            target.database == "orders" && target.user == "backup" && target.host == "db.internal"
        })
        .times(1)
        .returning(move |_, mut sink, _| {
            sink.write_all(payload)
                .map_err(|error| ArchiverError::stream(error.to_string()))
        });
    archiver
}

fn idle_archiver() -> MockArchiver {
    let mut archiver = MockArchiver::new();
    archiver.expect_dump().never();
    archiver
}

#[rstest]
fn successful_backup_leaves_only_the_compressed_artifact(scratch: Scratch) {
    let mut out = Vec::new();

    let outcome = service(writing_archiver(DUMP_BYTES))
        .run(&scratch.config, &mut out)
        .expect("backup should succeed");

    assert_eq!(outcome.artifact, scratch.artifact_path());
    assert!(outcome.sweep.deleted.is_empty());
    assert!(!scratch.dump_path().exists());
    assert_eq!(
        scratch.backup_entries(),
        [format!("orders_{FIXTURE_STAMP}.dump.gz")]
    );

    let compressed = fs::read(scratch.artifact_path()).expect("read artifact");
    let mut restored = Vec::new();
    decompress(compressed.as_slice(), &mut restored).expect("artifact should be gzip");
    assert_eq!(restored, DUMP_BYTES);
}

#[rstest]
fn successful_backup_reports_progress(scratch: Scratch) {
    let mut out = Vec::new();

    service(writing_archiver(DUMP_BYTES))
        .run(&scratch.config, &mut out)
        .expect("backup should succeed");

    let artifact = scratch.artifact_path();
    assert_eq!(
        String::from_utf8(out).expect("utf-8 output"),
        format!(
            "Starting backup for database 'orders'...\n\
             Backup successful: {}\n\
             Cleaning up old backups...\n\
             Cleanup complete.\n",
            artifact.display()
        )
    );
    assert_eq!(
        log_messages(&scratch.config.log_file),
        [
            "INFO: Starting backup for database 'orders'.".to_owned(),
            format!("SUCCESS: Backup completed. File: {}", artifact.display()),
            "INFO: Cleaning up backups older than 7 days.".to_owned(),
            "SUCCESS: Cleanup complete.".to_owned(),
        ]
    );
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
fn missing_database_touches_nothing(mut scratch: Scratch, #[case] database: &str) {
    database.clone_into(&mut scratch.config.database);
    let mut out = Vec::new();

    let err = service(idle_archiver())
        .run(&scratch.config, &mut out)
        .expect_err("backup should be rejected");

    assert!(matches!(err, PipelineError::MissingDatabase));
    assert!(!scratch.config.log_file.exists());
    assert!(scratch.backup_entries().is_empty());
    assert!(out.is_empty());
}

#[rstest]
fn missing_backup_dir_is_rejected_before_launch(mut scratch: Scratch) {
    scratch.config.backup_dir = scratch.temp.path().join("absent");
    let mut out = Vec::new();

    let err = service(idle_archiver())
        .run(&scratch.config, &mut out)
        .expect_err("backup should be rejected");

    assert!(matches!(
        err,
        PipelineError::BackupDirNotFound { ref path } if *path == scratch.config.backup_dir
    ));
    assert!(err.is_validation());
    assert!(!scratch.config.log_file.exists());
}

#[rstest]
fn backup_dir_that_is_a_file_is_unavailable(mut scratch: Scratch) {
    let not_a_dir = scratch.temp.path().join("backups.txt");
    fs::write(&not_a_dir, b"").expect("write file");
    scratch.config.backup_dir = not_a_dir;
    let mut out = Vec::new();

    let err = service(idle_archiver())
        .run(&scratch.config, &mut out)
        .expect_err("backup should be rejected");

    assert!(matches!(err, PipelineError::BackupDirUnavailable { .. }));
}

#[rstest]
fn failed_dump_removes_the_partial_file(scratch: Scratch) {
    let mut archiver = MockArchiver::new();
    archiver
        .expect_dump()
        .times(1)
        .returning(|_, mut sink, _| {
            sink.write_all(b"PGDMP partial").expect("write partial dump");
            Err(ArchiverError::exited("pg_dump", "exit status: 1"))
        });
    let mut out = Vec::new();

    let err = service(archiver)
        .run(&scratch.config, &mut out)
        .expect_err("backup should fail");

    assert!(matches!(
        err,
        PipelineError::Archiver {
            stage: PipelineStage::Backup,
            ..
        }
    ));
    assert_eq!(err.to_string(), "Backup failed. Check log for details.");
    assert!(scratch.backup_entries().is_empty());
    assert!(
        log_messages(&scratch.config.log_file)
            .contains(&"ERROR: Backup failed: 'pg_dump' failed with exit status: 1".to_owned())
    );
}

#[rstest]
fn dump_diagnostics_reach_the_log_without_leftovers(scratch: Scratch) {
    let dump_path = scratch.dump_path();
    let mut archiver = MockArchiver::new();
    archiver
        .expect_dump()
        .times(1)
        .returning(move |_, _, mut diagnostics| {
            assert!(dump_path.exists(), "dump created before the archiver runs");
            writeln!(diagnostics, "pg_dump: error: connection refused")
                .expect("write diagnostics");
            Err(ArchiverError::exited("pg_dump", "exit status: 1"))
        });
    let mut out = Vec::new();

    service(archiver)
        .run(&scratch.config, &mut out)
        .expect_err("backup should fail");

    assert!(scratch.backup_entries().is_empty());
    let log = fs::read_to_string(&scratch.config.log_file).expect("read log");
    let diagnostics_at = log
        .find("pg_dump: error: connection refused")
        .expect("diagnostics appended to the log");
    let failure_at = log
        .find("ERROR: Backup failed: ")
        .expect("failure recorded");
    assert!(diagnostics_at < failure_at);
}

#[rstest]
fn existing_artifact_is_never_overwritten(scratch: Scratch) {
    fs::write(scratch.artifact_path(), b"earlier run").expect("seed artifact");
    let mut out = Vec::new();

    let err = service(idle_archiver())
        .run(&scratch.config, &mut out)
        .expect_err("backup should refuse to overwrite");

    assert!(matches!(
        err,
        PipelineError::ArtifactExists { ref path } if *path == scratch.artifact_path()
    ));
    assert_eq!(
        fs::read(scratch.artifact_path()).expect("read artifact"),
        b"earlier run"
    );
}

#[rstest]
fn existing_dump_is_never_overwritten(scratch: Scratch) {
    fs::write(scratch.dump_path(), b"in flight").expect("seed dump");
    let mut out = Vec::new();

    let err = service(idle_archiver())
        .run(&scratch.config, &mut out)
        .expect_err("backup should refuse to overwrite");

    assert!(matches!(
        err,
        PipelineError::ArtifactExists { ref path } if *path == scratch.dump_path()
    ));
    assert_eq!(
        fs::read(scratch.dump_path()).expect("read dump"),
        b"in flight"
    );
}

#[cfg(unix)]
#[rstest]
fn compression_failure_keeps_the_dump(scratch: Scratch) {
    // A directory appearing on the artifact name while the dump runs makes
    // creating the artifact fail.
    let squatter = scratch.artifact_path();
    let mut archiver = MockArchiver::new();
    archiver
        .expect_dump()
        .times(1)
        .returning(move |_, mut sink, _| {
            fs::create_dir(&squatter).expect("squat artifact name");
            sink.write_all(DUMP_BYTES)
                .map_err(|error| ArchiverError::stream(error.to_string()))
        });
    let mut out = Vec::new();

    let err = service(archiver)
        .run(&scratch.config, &mut out)
        .expect_err("compression should fail");

    assert!(matches!(
        err,
        PipelineError::Codec {
            stage: CodecStage::Compression,
            ..
        }
    ));
    assert_eq!(fs::read(scratch.dump_path()).expect("dump retained"), DUMP_BYTES);
    let messages = log_messages(&scratch.config.log_file);
    assert!(
        messages
            .iter()
            .any(|line| line.starts_with("ERROR: Compression failed: "))
    );
    assert!(messages.contains(&format!(
        "WARNING: Uncompressed dump retained at {}",
        scratch.dump_path().display()
    )));
}
