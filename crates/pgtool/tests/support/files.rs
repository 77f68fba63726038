//! File helpers for integration tests.

use std::fs::{self, File};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};

/// Write `path` and backdate its modification time to `days` before `now`.
pub fn write_aged(path: &Path, now: DateTime<Utc>, days: i64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directories");
    }
    fs::write(path, b"artifact").expect("write aged file");
    set_modified(path, now - Duration::days(days));
}

/// Set the modification time of an existing file.
pub fn set_modified(path: &Path, at: DateTime<Utc>) {
    File::options()
        .write(true)
        .open(path)
        .expect("open file for touch")
        .set_modified(SystemTime::from(at))
        .expect("set modification time");
}
