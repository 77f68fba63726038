//! `pgtool` entry-point: wires the process archiver, the system clock, and
//! `PGTOOL_*` settings into the application.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use pgtool::archiver::CommandArchiver;
use pgtool::{App, Credential, PgtoolSettings, RunStatus};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Flags are parsed by the application; settings come from the
    // environment and configuration files only.
    let settings = match PgtoolSettings::load_from_iter([OsString::from("pgtool")]) {
        Ok(settings) => settings,
        Err(error) => {
            if let Err(write_error) = writeln!(out, "Error: Invalid configuration: {error}") {
                warn!(error = %write_error, "failed to write operator output");
            }
            return RunStatus::Failure.into();
        }
    };

    let archiver = CommandArchiver::from_settings(&settings, Credential::from_env());
    let app = App::new(Arc::new(archiver), Arc::new(DefaultClock), settings);
    app.run(env::args_os(), &mut out).into()
}
