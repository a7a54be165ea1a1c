//! External tool execution.
//!
//! Every tool the pipeline drives (`git`, `git lfs`, `cargo`, `wasm-bindgen`)
//! goes through [`CommandRunner`]. A [`CommandSpec`] always carries its own
//! working directory, so nothing here reads or mutates the process-wide
//! current directory.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ProcessError;

/// Interval between exit checks while waiting on a child with a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A single external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute (looked up on `PATH` when not a path).
    pub program: OsString,
    /// Arguments, in order.
    pub args: Vec<OsString>,
    /// Working directory for the child.
    pub cwd: PathBuf,
    /// Environment variables added on top of the inherited environment.
    pub envs: Vec<(OsString, OsString)>,
    /// Kill the child and fail once this much time has passed.
    pub timeout: Option<Duration>,
    /// Forward the child's stdout/stderr to ours instead of capturing them.
    pub stream_output: bool,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<OsStr>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: cwd.into(),
            envs: Vec::new(),
            timeout: None,
            stream_output: false,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn stream_output(mut self, stream: bool) -> Self {
        self.stream_output = stream;
        self
    }

    /// Program name as shown in logs and error messages.
    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Shell-like rendering of the command line (no quoting).
    pub fn display(&self) -> String {
        let mut rendered = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(&arg.to_string_lossy());
        }
        rendered
    }

    /// Returns true if any argument equals `needle`.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|arg| arg == needle)
    }

    /// Looks up an environment variable set on this spec.
    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.envs
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_os_str())
    }
}

/// Result of a finished child process.
///
/// A non-zero exit is not an error at this level; callers decide what a
/// failing exit means for their operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    /// Captured stdout (empty when streaming).
    pub stdout: String,
    /// Captured stderr (empty when streaming).
    pub stderr: String,
}

impl CommandOutput {
    /// A successful, silent exit.
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Self::default()
        }
    }

    /// A failed exit with the given code and stderr.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stderr, falling back to stdout when stderr is empty.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Executes [`CommandSpec`]s.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        (**self).run(spec)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let program = spec.program_name();
        debug!(
            command = %spec.display(),
            cwd = %spec.cwd.display(),
            timeout_secs = spec.timeout.map(|t| t.as_secs_f64()),
            "spawning"
        );

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(spec.envs.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null());
        if spec.stream_output {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        if spec.timeout.is_some() {
            own_process_group(&mut command);
        }

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match spec.timeout {
            None => child.wait().map_err(|source| ProcessError::Wait {
                program: program.clone(),
                source,
            })?,
            Some(timeout) => wait_with_deadline(&mut child, timeout, &program)?,
        };

        let output = CommandOutput {
            code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        };
        debug!(
            program = %program,
            code = ?output.code,
            duration_ms = start.elapsed().as_millis(),
            "finished"
        );
        Ok(output)
    }
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    program: &str,
) -> Result<ExitStatus, ProcessError> {
    let deadline = Instant::now() + timeout;
    loop {
        let polled = child.try_wait().map_err(|source| ProcessError::Wait {
            program: program.to_string(),
            source,
        })?;
        if let Some(status) = polled {
            return Ok(status);
        }
        let now = Instant::now();
        if now >= deadline {
            warn!(program, timeout_secs = timeout.as_secs_f64(), "killing child after timeout");
            if let Err(error) = kill_process_tree(child) {
                debug!(program, %error, "group kill failed, killing child only");
                // The child may have exited between the poll and the kill.
                let _ = child.kill();
            }
            let _ = child.wait();
            return Err(ProcessError::TimedOut {
                program: program.to_string(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Puts the child in a fresh process group so a timeout reaches everything it spawned.
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(child.id()).map_err(io::Error::other)?;
    killpg(Pid::from_raw(pgid), Signal::SIGKILL)?;
    Ok(())
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    child.kill()
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
