//! The error returned when running `nydus-image` fails.

use std::io;
use std::process::ExitStatus;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Running `nydus-image` failed; this always carries the full command line.
#[derive(Debug, thiserror::Error)]
#[error("failed to run {command}")]
pub struct Error {
    command: String,
    #[source]
    kind: FailureKind,
}

/// What went wrong.
#[derive(Debug, thiserror::Error)]
pub enum FailureKind {
    /// The process could not be started, e.g. the binary is missing.
    #[error("failed to spawn: {0}")]
    Spawn(io::Error),
    /// Feeding stdin or forwarding stdout/stderr failed.
    #[error("failed to service standard streams: {0}")]
    Io(io::Error),
    /// The process exited unsuccessfully.
    #[error("process {0}")]
    Exited(ExitStatus),
}

impl Error {
    pub(crate) fn new(command: String, kind: FailureKind) -> Self {
        Self { command, kind }
    }

    /// The shell-quoted command line that failed.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The cause of the failure.
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// The exit status, if the process ran to completion.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self.kind {
            FailureKind::Exited(status) => Some(status),
            _ => None,
        }
    }
}
