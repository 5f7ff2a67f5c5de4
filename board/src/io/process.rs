//! Child processes for state commands.
//!
//! The [`CommandRunner`] trait decouples the engine from real process
//! spawning. Tests use scripted runners that return predetermined
//! completions without spawning anything.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{Instrument, debug, debug_span, warn};

use crate::core::model::ERROR_SINK_STATE_ID;
use crate::io::settings::RuntimeSettings;

/// How a state command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The process exited with this code.
    Exited(i32),
    /// The process was terminated by a signal and has no exit code.
    Signaled,
    /// The process ran past the configured timeout and was killed.
    TimedOut,
    /// The process could not be started, or waiting on it failed.
    LaunchFailed(String),
}

impl Completion {
    /// Exit code as seen by the state machine.
    ///
    /// Anything other than a normal exit counts as the error-sink id.
    pub fn exit_code(&self) -> i64 {
        match self {
            Completion::Exited(code) => i64::from(*code),
            _ => ERROR_SINK_STATE_ID,
        }
    }
}

/// Abstraction over command execution backends.
pub trait CommandRunner: Send + Sync + 'static {
    /// Run `command` to completion. Never fails; problems are reported as a
    /// [`Completion`] variant.
    fn run(&self, command: &str) -> impl Future<Output = Completion> + Send;
}

/// Runner that hands each command line to a shell (`sh -c` by default).
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: Vec<String>,
    timeout: Option<Duration>,
}

impl ShellRunner {
    pub fn new(shell: Vec<String>, timeout: Option<Duration>) -> Self {
        Self { shell, timeout }
    }

    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        Self::new(settings.shell.clone(), settings.command_timeout())
    }

    fn command(&self, line: &str) -> Option<Command> {
        let (program, args) = self.shell.split_first()?;
        let mut cmd = Command::new(program);
        cmd.args(args).arg(line).stdin(Stdio::null());
        Some(cmd)
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::from_settings(&RuntimeSettings::default())
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> impl Future<Output = Completion> + Send {
        let cmd = self.command(command);
        let timeout = self.timeout;
        let span = debug_span!("run_command", command);
        async move {
            let Some(mut cmd) = cmd else {
                warn!("no shell configured");
                return Completion::LaunchFailed("no shell configured".to_string());
            };

            debug!("spawning child process");
            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    warn!(err = %e, "failed to launch command");
                    return Completion::LaunchFailed(e.to_string());
                }
            };

            let waited = match timeout {
                None => child.wait().await,
                Some(limit) => {
                    let outcome = tokio::time::timeout(limit, child.wait()).await;
                    match outcome {
                        Ok(waited) => waited,
                        Err(_) => {
                            warn!(timeout_secs = limit.as_secs(), "command timed out, killing");
                            if let Err(e) = child.kill().await {
                                warn!(err = %e, "failed to kill timed out command");
                            }
                            return Completion::TimedOut;
                        }
                    }
                }
            };

            match waited {
                Ok(status) => {
                    debug!(exit_code = ?status.code(), "command finished");
                    match status.code() {
                        Some(code) => Completion::Exited(code),
                        None => Completion::Signaled,
                    }
                }
                Err(e) => {
                    warn!(err = %e, "failed to wait for command");
                    Completion::LaunchFailed(e.to_string())
                }
            }
        }
        .instrument(span)
    }
}
