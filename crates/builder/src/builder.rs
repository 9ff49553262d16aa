//! Run `nydus-image` with the arguments for each operation.

use std::io::{self, Write};
use std::process::{ChildStdin, Command, ExitStatus, Stdio};
use std::thread::ScopedJoinHandle;

use camino::{Utf8Path, Utf8PathBuf};
use nydus_builder_utils::CommandRunExt;

use crate::error::{Error, FailureKind, Result};
use crate::options::{BuildOptions, CheckOptions, CompactOptions, GenerateOptions};
use crate::sink::Sink;

/// Runs a `nydus-image` binary.
///
/// The builder only remembers the binary and where its output goes, so a
/// single instance can be shared between threads; every call spawns its own
/// process and blocks until it exits.
#[derive(Debug)]
pub struct Builder {
    binary: Utf8PathBuf,
    stdout: Sink,
    stderr: Sink,
}

impl Builder {
    /// Create a builder for the given binary. Output and errors of the
    /// child are inherited from the current process.
    pub fn new(binary: impl Into<Utf8PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            stdout: Sink::Inherit,
            stderr: Sink::Inherit,
        }
    }

    /// Send the child's standard output to `sink`.
    pub fn with_stdout(mut self, sink: Sink) -> Self {
        self.stdout = sink;
        self
    }

    /// Send the child's standard error to `sink`.
    pub fn with_stderr(mut self, sink: Sink) -> Self {
        self.stderr = sink;
        self
    }

    /// Path to the `nydus-image` binary.
    pub fn binary(&self) -> &Utf8Path {
        &self.binary
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd
    }

    /// The shell-quoted command line that would run for `args`.
    pub fn command_line(&self, args: &[String]) -> String {
        self.command(args).to_string_pretty()
    }

    /// Build a layer bootstrap and blob with `nydus-image create`.
    ///
    /// Prefetch patterns, if any, are written to the child's stdin.
    pub fn create(&self, opts: &BuildOptions) -> Result<()> {
        self.run(&opts.args(), opts.prefetch_patterns.as_bytes())
    }

    /// Compact a bootstrap and its blobs with `nydus-image compact`.
    pub fn compact(&self, opts: &CompactOptions) -> Result<()> {
        self.run(&opts.args(), &[])
    }

    /// Generate a chunk dictionary with `nydus-image chunkdict generate`.
    pub fn generate(&self, opts: &GenerateOptions) -> Result<()> {
        tracing::info!("Invoking 'nydus-image chunkdict generate' command");
        self.run(&opts.args(), &[])
    }

    /// Validate a bootstrap with `nydus-image check`.
    pub fn check(&self, opts: &CheckOptions) -> Result<()> {
        self.run(&opts.args(), &[])
    }

    fn run(&self, args: &[String], input: &[u8]) -> Result<()> {
        let mut cmd = self.command(args);
        let command = cmd.to_string_pretty();
        tracing::debug!("Command: {command}");

        match self.execute(&mut cmd, input) {
            Ok(()) => Ok(()),
            Err(kind) => {
                tracing::error!("Failed to run {} {:?}: {kind}", self.binary, args);
                Err(Error::new(command, kind))
            }
        }
    }

    fn execute(&self, cmd: &mut Command, input: &[u8]) -> std::result::Result<(), FailureKind> {
        cmd.stdin(Stdio::piped())
            .stdout(self.stdout.stdio())
            .stderr(self.stderr.stdio());
        let mut child = cmd.spawn().map_err(FailureKind::Spawn)?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Feed and drain concurrently, otherwise a chatty child and a large
        // payload can deadlock on full pipes.
        let (status, streams) = std::thread::scope(|s| {
            let feeder = s.spawn(move || feed(stdin, input));
            let out = s.spawn(|| self.stdout.forward(stdout));
            let err = s.spawn(|| self.stderr.forward(stderr));
            let streams = join(feeder).and(join(out)).and(join(err));
            (child.wait(), streams)
        });
        let status: ExitStatus = status.map_err(FailureKind::Io)?;
        if !status.success() {
            return Err(FailureKind::Exited(status));
        }
        streams.map_err(FailureKind::Io)
    }
}

/// Write `input` to the child and close its stdin.
fn feed(stdin: Option<ChildStdin>, input: &[u8]) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(input) {
        // The child is free to exit without reading its input.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        r => r,
    }
}

fn join<T>(h: ScopedJoinHandle<'_, T>) -> T {
    h.join().unwrap_or_else(|e| std::panic::resume_unwind(e))
}
