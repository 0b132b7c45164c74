//! Process-based plugin invocation.
//!
//! [`ProcessInvoker`] implements the [`Invoker`] trait by materialising the
//! argument file, spawning the plugin executable with the file path as its
//! single positional argument, capturing stdout and stderr into separate
//! buffers, and enforcing the optional timeout. No shell is involved at any
//! point and the child environment is constructed explicitly from the
//! request's [`EnvPolicy`], never inherited implicitly.
//!
//! Spawn failures are not errors: they surface as
//! [`Termination::LaunchFailed`] so one unlaunchable plugin can never abort
//! sibling invocations in a batch.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::args::{ArgumentFile, ParameterSet};

/// Tracing target for invocation events.
const INVOKE_TARGET: &str = "reeve_plugins::invoke";

/// Interval between exit polls while a plugin runs.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Environment construction policy for a plugin process.
///
/// The child environment is always built from scratch so invocations stay
/// reproducible; there is deliberately no way to inherit the full parent
/// environment implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnvPolicy {
    /// Launch the plugin with an empty environment.
    #[default]
    Clean,
    /// Copy only the named variables from the parent environment. Variables
    /// absent from the parent are silently skipped.
    AllowList(BTreeSet<String>),
}

impl EnvPolicy {
    /// Resolves the policy against the current parent environment.
    pub(crate) fn resolve(&self) -> Vec<(String, String)> {
        match self {
            Self::Clean => Vec::new(),
            Self::AllowList(names) => names
                .iter()
                .filter_map(|name| {
                    std::env::var(name)
                        .ok()
                        .map(|value| (name.clone(), value))
                })
                .collect(),
        }
    }
}

/// One plugin invocation: executable, parameters, timeout, environment.
///
/// Immutable once built; the engine consumes it to produce an
/// [`ExecutionReport`](crate::report::ExecutionReport) and hands it back
/// inside the report for correlation.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use reeve_plugins::{InvocationRequest, ParameterSet};
///
/// let mut params = ParameterSet::new();
/// params.insert("state", "present").expect("valid parameter");
///
/// let request = InvocationRequest::new("/usr/lib/reeve/file", params)
///     .with_timeout(Duration::from_secs(30));
/// assert_eq!(request.timeout(), Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    executable: PathBuf,
    params: ParameterSet,
    timeout: Option<Duration>,
    env: EnvPolicy,
}

impl InvocationRequest {
    /// Creates a request with no timeout and a clean environment.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>, params: ParameterSet) -> Self {
        Self {
            executable: executable.into(),
            params,
            timeout: None,
            env: EnvPolicy::Clean,
        }
    }

    /// Bounds the plugin's run time; on expiry the process is killed and
    /// the invocation reports a timeout contract violation.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the environment policy.
    #[must_use]
    pub fn with_env_policy(mut self, env: EnvPolicy) -> Self {
        self.env = env;
        self
    }

    /// Returns the plugin executable path.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Returns the parameters to marshal into the argument file.
    #[must_use]
    pub const fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the environment policy.
    #[must_use]
    pub const fn env_policy(&self) -> &EnvPolicy {
        &self.env
    }
}

/// How a plugin invocation ended at the process level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The process terminated on its own with the given exit code.
    ///
    /// A process killed by a signal reports code `-1`.
    Exited(i32),
    /// The process outlived its timeout and was killed.
    TimedOut,
    /// The process could not be started at all.
    LaunchFailed {
        /// Description of the spawn failure.
        message: String,
    },
}

impl Termination {
    /// Returns the exit code for a normally terminated process.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::TimedOut | Self::LaunchFailed { .. } => None,
        }
    }
}

/// Captured process output: stdout and stderr bytes plus the termination.
///
/// The two streams are captured separately and never merged; the contract
/// requires stdout to be pure JSON, so stray stderr text must not
/// contaminate the parse. Stderr is retained only for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    termination: Termination,
}

impl RawOutput {
    /// Assembles a captured output record.
    #[must_use]
    pub const fn new(stdout: Vec<u8>, stderr: Vec<u8>, termination: Termination) -> Self {
        Self {
            stdout,
            stderr,
            termination,
        }
    }

    /// Builds the empty output of an invocation that never spawned.
    #[must_use]
    pub fn launch_failed(message: impl Into<String>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            termination: Termination::LaunchFailed {
                message: message.into(),
            },
        }
    }

    /// Returns the captured stdout bytes.
    #[must_use]
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Returns the captured stderr bytes.
    #[must_use]
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    /// Returns how the process ended.
    #[must_use]
    pub const fn termination(&self) -> &Termination {
        &self.termination
    }
}

/// Trait abstracting plugin process invocation for testability.
///
/// The production implementation is [`ProcessInvoker`]. Test code can
/// implement this trait to feed the engine canned output without spawning
/// real processes.
pub trait Invoker {
    /// Runs the plugin described by the request and captures its output.
    ///
    /// Never fails: spawn problems are reported through
    /// [`Termination::LaunchFailed`] in the returned output.
    fn invoke(&self, request: &InvocationRequest) -> RawOutput;
}

/// Invokes plugins by spawning real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

impl Invoker for ProcessInvoker {
    fn invoke(&self, request: &InvocationRequest) -> RawOutput {
        // The argument file may hold secrets; the guard deletes it on every
        // exit path out of this function, including panics.
        let argfile = match ArgumentFile::materialise(request.params()) {
            Ok(file) => file,
            Err(err) => {
                warn!(
                    target: INVOKE_TARGET,
                    executable = %request.executable().display(),
                    error = %err,
                    "failed to materialise argument file"
                );
                return RawOutput::launch_failed(format!("argument file: {err}"));
            }
        };
        run_child(request, argfile.path())
    }
}

/// Builds the child command: one positional argument, no stdin, piped
/// output streams, explicit environment.
fn build_command(request: &InvocationRequest, argfile: &Path) -> Command {
    let mut command = Command::new(request.executable());
    command
        .arg(argfile)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_clear()
        .envs(request.env_policy().resolve());
    command
}

/// Spawns the plugin and captures its streams until termination.
fn run_child(request: &InvocationRequest, argfile: &Path) -> RawOutput {
    let mut command = build_command(request, argfile);

    debug!(
        target: INVOKE_TARGET,
        executable = %request.executable().display(),
        argfile = %argfile.display(),
        "spawning plugin process"
    );

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(
                target: INVOKE_TARGET,
                executable = %request.executable().display(),
                error = %err,
                "plugin failed to start"
            );
            return RawOutput::launch_failed(err.to_string());
        }
    };

    let Some(stdout) = child.stdout.take() else {
        drop(child.kill());
        drop(child.wait());
        return RawOutput::launch_failed("failed to capture stdout");
    };
    let Some(stderr) = child.stderr.take() else {
        drop(child.kill());
        drop(child.wait());
        return RawOutput::launch_failed("failed to capture stderr");
    };

    // Dedicated reader threads keep both pipes drained so the child can
    // never block on a full buffer while we poll for exit.
    let stdout_reader = capture(stdout);
    let stderr_reader = capture(stderr);

    let termination = wait_for_exit(&mut child, request.timeout());

    let stdout_bytes = stdout_reader.join().unwrap_or_default();
    let stderr_bytes = stderr_reader.join().unwrap_or_default();

    debug!(
        target: INVOKE_TARGET,
        executable = %request.executable().display(),
        ?termination,
        stdout_bytes = stdout_bytes.len(),
        stderr_bytes = stderr_bytes.len(),
        "plugin process finished"
    );

    RawOutput::new(stdout_bytes, stderr_bytes, termination)
}

/// Drains a stream to completion on its own thread.
fn capture(stream: impl Read + Send + 'static) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut reader = stream;
        let mut buffer = Vec::new();
        drop(reader.read_to_end(&mut buffer));
        buffer
    })
}

/// Waits for the child to exit, killing it when the timeout expires.
fn wait_for_exit(child: &mut Child, timeout: Option<Duration>) -> Termination {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Termination::Exited(status.code().unwrap_or(-1));
            }
            Ok(None) => {
                if let Some(limit) = timeout
                    && start.elapsed() > limit
                {
                    warn!(
                        target: INVOKE_TARGET,
                        timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        "plugin timed out, killing process"
                    );
                    drop(child.kill());
                    drop(child.wait());
                    return Termination::TimedOut;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                drop(child.kill());
                drop(child.wait());
                return Termination::LaunchFailed {
                    message: err.to_string(),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests;
