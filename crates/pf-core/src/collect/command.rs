//! Bounded execution of external introspection tools (`ps`, `lsof`).
//!
//! Output is read on a helper thread while the caller polls the child, so a
//! tool that hangs is killed after the timeout instead of blocking the scan.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// Default timeout for a single tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command not found: {0}")]
    NotFound(String),

    #[error("{program} failed to spawn: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CommandError> for std::io::Error {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Io(e) => e,
            CommandError::SpawnFailed { source, .. } => source,
            CommandError::NotFound(program) => {
                std::io::Error::new(std::io::ErrorKind::NotFound, program)
            }
            CommandError::Timeout { program, timeout } => std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("{program} timed out after {timeout:?}"),
            ),
        }
    }
}

/// Captured result of a tool invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `program args...`, capturing stdout, killing it after `timeout`.
///
/// stderr is discarded. A non-zero exit status is not an error here: `lsof`
/// and `ps -p` use exit status 1 for "nothing found", so the caller decides.
pub fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    trace!(program, ?args, "spawning tool");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CommandError::NotFound(program.to_string())
            } else {
                CommandError::SpawnFailed {
                    program: program.to_string(),
                    source,
                }
            }
        })?;

    let mut stdout = child.stdout.take();
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(out) = stdout.as_mut() {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            debug!(program, ?timeout, "tool timed out, killing");
            let _ = child.kill();
            let _ = child.wait();
            // A grandchild may still hold the pipe; leave the reader detached.
            drop(reader);
            return Err(CommandError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
        thread::sleep(Duration::from_millis(5));
    };

    let bytes = reader.join().unwrap_or_default();
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&bytes).into_owned(),
        exit_code: status.code(),
    })
}
