//! External command execution with explicit argument lists and timeouts.
use crate::error::{PublishError, Result};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long to wait for captured pipes to close once the command is done.
const DRAIN_GRACE: Duration = Duration::from_secs(5);
const REDACTED: &str = "***";

/// One external command: program, argv, and which args must not be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    secret_args: Vec<usize>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            secret_args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `flag value` only when `value` is present.
    pub fn opt_pair(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value),
            None => self,
        }
    }

    /// Append an argument that is masked in [`Invocation::command_line`].
    pub fn secret(mut self, arg: impl Into<String>) -> Self {
        self.secret_args.push(self.args.len());
        self.arg(arg)
    }

    /// Shell-quoted rendering for logs, with secrets masked.
    pub fn command_line(&self) -> String {
        let args = self.args.iter().enumerate().map(|(idx, arg)| {
            if self.secret_args.contains(&idx) {
                REDACTED
            } else {
                arg.as_str()
            }
        });
        shell_words::join(std::iter::once(self.program.as_str()).chain(args))
    }

    /// Short label such as `dotnet pack` for timeout and failure messages.
    pub fn label(&self) -> String {
        match self.args.iter().find(|arg| !arg.starts_with('-')) {
            Some(sub) => format!("{} {sub}", self.program),
            None => self.program.clone(),
        }
    }
}

/// Result of a command whose output was captured.
#[derive(Debug, Clone)]
pub struct Captured {
    pub success: bool,
    pub status: String,
    /// stdout followed by stderr.
    pub output: String,
}

pub trait CommandRunner {
    /// Run with output passed straight through; a non-zero exit is an error.
    fn run(&self, invocation: &Invocation) -> Result<()>;

    /// Run with output captured; the exit status is returned, not judged.
    fn capture(&self, invocation: &Invocation) -> Result<Captured>;
}

/// Runs real processes, killing any that exceed `timeout`.
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        ProcessRunner { timeout }
    }

    fn command(&self, invocation: &Invocation) -> Result<Command> {
        let program = resolve_program(&invocation.program)?;
        let mut command = Command::new(program);
        command.args(&invocation.args).stdin(Stdio::null());
        // Own process group, so a timeout can take down helpers the tool forks.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        Ok(command)
    }

    fn wait(&self, child: &mut Child, invocation: &Invocation) -> Result<ExitStatus> {
        let start = Instant::now();
        loop {
            let polled = child.try_wait().map_err(|source| PublishError::ToolSpawn {
                program: invocation.program.clone(),
                source,
            })?;
            if let Some(status) = polled {
                tracing::debug!(
                    elapsed_ms = start.elapsed().as_millis(),
                    command = %invocation.label(),
                    %status,
                    "command exited"
                );
                return Ok(status);
            }
            if start.elapsed() > self.timeout {
                kill_group(child);
                let _ = child.kill();
                let _ = child.wait();
                return Err(PublishError::Timeout {
                    what: invocation.label(),
                    after: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        tracing::info!(command = %invocation.command_line(), "executing");
        let mut child = self
            .command(invocation)?
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| PublishError::ToolSpawn {
                program: invocation.program.clone(),
                source,
            })?;
        let status = self.wait(&mut child, invocation)?;
        if !status.success() {
            return Err(PublishError::ToolFailed {
                command: invocation.label(),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    fn capture(&self, invocation: &Invocation) -> Result<Captured> {
        tracing::info!(command = %invocation.command_line(), "executing");
        let mut child = self
            .command(invocation)?
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PublishError::ToolSpawn {
                program: invocation.program.clone(),
                source,
            })?;
        // Drain both pipes while polling so a chatty child never blocks on a full pipe.
        let stdout = child.stdout.take().map(|pipe| drain(pipe, "stdout"));
        let stderr = child.stderr.take().map(|pipe| drain(pipe, "stderr"));
        let status = self.wait(&mut child, invocation)?;
        // Leftover group members would hold the pipes open.
        kill_group(&child);

        let mut output = collect(stdout, "stdout");
        output.push_str(&collect(stderr, "stderr"));
        Ok(Captured {
            success: status.success(),
            status: status.to_string(),
            output,
        })
    }
}

fn resolve_program(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|source| PublishError::ToolMissing {
        program: program.to_string(),
        source,
    })
}

/// SIGKILL the child's process group. A group that is already gone is fine.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created at spawn.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn drain<R: Read + Send + 'static>(mut reader: R, stream: &'static str) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(err) = reader.read_to_end(&mut buf) {
            tracing::warn!(stream, error = %err, bytes = buf.len(), "reading command output failed");
        }
        let _ = tx.send(buf);
    });
    rx
}

fn collect(drained: Option<Receiver<Vec<u8>>>, stream: &'static str) -> String {
    let Some(rx) = drained else {
        return String::new();
    };
    match rx.recv_timeout(DRAIN_GRACE) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => {
            tracing::warn!(stream, "command output still open after exit, ignoring it");
            String::new()
        }
    }
}
