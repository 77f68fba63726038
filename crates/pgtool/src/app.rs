//! Command dispatch and exit-status mapping.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, error};

use crate::cli::{self, Invocation};
use crate::config::PgtoolSettings;
use crate::error::PipelineError;
use crate::pipeline::{BackupService, RestoreService, announce};
use crate::ports::Archiver;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The command completed; exit status 0.
    Success,
    /// Arguments, configuration, or a pipeline stage failed; exit status 1.
    Failure,
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Success => Self::SUCCESS,
            RunStatus::Failure => Self::FAILURE,
        }
    }
}

/// The `pgtool` application: parses a command line and runs one pipeline.
pub struct App<A> {
    archiver: Arc<A>,
    clock: Arc<dyn Clock>,
    settings: PgtoolSettings,
}

impl<A> App<A> {
    /// Assemble the application from its collaborators.
    pub const fn new(archiver: Arc<A>, clock: Arc<dyn Clock>, settings: PgtoolSettings) -> Self {
        Self {
            archiver,
            clock,
            settings,
        }
    }
}

impl<A> App<A>
where
    A: Archiver,
{
    /// Run the command described by `args`, program name first.
    ///
    /// Operator lines, including error lines, are written to `out`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use pgtool::ports::FixtureArchiver;
    /// use pgtool::{App, PgtoolSettings, RunStatus};
    ///
    /// let app = App::new(
    ///     Arc::new(FixtureArchiver),
    ///     Arc::new(DefaultClock),
    ///     PgtoolSettings::unconfigured(),
    /// );
    /// let mut out = Vec::new();
    ///
    /// assert_eq!(app.run(["pgtool", "backup"], &mut out), RunStatus::Failure);
    /// assert_eq!(out, b"Error: Database name is required.\n");
    /// ```
    pub fn run<I, T>(&self, args: I, out: &mut dyn Write) -> RunStatus
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let invocation = match cli::parse(args) {
            Ok(invocation) => invocation,
            Err(cli_error) => {
                debug!(error = ?cli_error, "command line rejected");
                announce(out, &cli_error);
                return RunStatus::Failure;
            }
        };

        let outcome = match invocation {
            Invocation::Help(text) => {
                announce(out, text.trim_end());
                return RunStatus::Success;
            }
            Invocation::Backup(args) => {
                let config = args.into_config(&self.settings);
                BackupService::new(Arc::clone(&self.archiver), Arc::clone(&self.clock))
                    .run(&config, out)
                    .map(|backup| {
                        debug!(
                            artifact = %backup.artifact.display(),
                            swept = backup.sweep.deleted.len(),
                            "backup finished"
                        );
                    })
            }
            Invocation::Restore(args) => {
                let config = args.into_config(&self.settings);
                RestoreService::new(Arc::clone(&self.archiver), Arc::clone(&self.clock))
                    .run(&config, out)
            }
        };
        finish(outcome, out)
    }
}

fn finish(outcome: Result<(), PipelineError>, out: &mut dyn Write) -> RunStatus {
    match outcome {
        Ok(()) => RunStatus::Success,
        Err(pipeline_error) => {
            if !pipeline_error.is_validation() {
                error!(error = ?pipeline_error, "pipeline failed");
            }
            announce(out, &pipeline_error);
            RunStatus::Failure
        }
    }
}
