//! Subprocess execution for the external collaborators.
//!
//! Everything that talks to Pandoc, pandoc-citeproc or ImageMagick goes
//! through the [`CommandRunner`] capability, so the wrappers can be tested
//! against a fake runner without the tools installed.

use std::process::Command;

use thiserror::Error;

/// Errors raised when launching or checking an external program.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with status {status}: {stderr}")]
    NonZeroExit {
        program: String,
        status: i32,
        stderr: String,
    },
}

/// Captured output of one collaborator invocation.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// Raw exit status; -1 when the process was killed by a signal.
    pub status: i32,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Capability to run an external program and capture its output.
///
/// The core never retries a failed invocation; failures are surfaced to the
/// caller as [`RunnerError`] values.
pub trait CommandRunner {
    /// Runs `program` with `args`, blocking until it exits.
    fn run(&self, program: &str, args: &[&str]) -> Result<RunOutput, RunnerError>;

    /// Runs `program` and treats a nonzero exit status as an error.
    fn run_checked(&self, program: &str, args: &[&str]) -> Result<RunOutput, RunnerError> {
        let output = self.run(program, args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(RunnerError::NonZeroExit {
                program: program.to_string(),
                status: output.status,
                stderr: output.stderr.trim_end().to_string(),
            })
        }
    }
}

/// Runs programs on the host system via [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<RunOutput, RunnerError> {
        tracing::debug!(program, ?args, "running external tool");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| RunnerError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code().unwrap_or(-1),
        })
    }
}
