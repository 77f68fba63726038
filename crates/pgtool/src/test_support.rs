//! Shared test doubles for unit tests.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

/// Artifact timestamp produced by [`fixture_clock`].
pub const FIXTURE_STAMP: &str = "2026-02-24_103005";

pub struct FixtureClock {
    local_now: DateTime<Local>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.local_now
    }

    fn utc(&self) -> DateTime<Utc> {
        self.local_now.with_timezone(&Utc)
    }
}

pub fn fixture_clock() -> Arc<dyn Clock> {
    let local_now = Local
        .with_ymd_and_hms(2026, 2, 24, 10, 30, 5)
        .earliest()
        .expect("valid fixture timestamp");
    Arc::new(FixtureClock { local_now })
}

/// Log lines with the timestamp prefix stripped.
pub fn log_messages(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("read operation log")
        .lines()
        .map(|line| line.get(20..).unwrap_or(line).to_owned())
        .collect()
}
