//! Launcher-side process supervision.
//!
//! The [`Supervisor`] owns at most one worker at a time. Launching a profile
//! first terminates the current worker (graceful stop, then forced kill after
//! the grace period) so two workers never compete for the camera.

mod display;
mod process;

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use crate::camera::Resolution;
use crate::error::ErrorClass;

pub use display::{DisplayChange, DisplayConfigurator, DisplayError, DEFAULT_DISPLAY_TIMEOUT};
pub use process::{ChildProcess, Liveness, TerminateOutcome, WorkerHandle, DEFAULT_GRACE_PERIOD};

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to start worker {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to kill worker: {0}")]
    Kill(#[source] std::io::Error),

    #[error("Failed to wait for worker: {0}")]
    Wait(#[source] std::io::Error),
}

impl SupervisorError {
    pub fn error_class(&self) -> ErrorClass {
        match self {
            SupervisorError::SpawnFailed { .. } => ErrorClass::FatalResource,
            SupervisorError::Kill(_) | SupervisorError::Wait(_) => ErrorClass::SupervisionTimeout,
        }
    }
}

/// How to start a worker: a program plus fixed leading arguments. The
/// profile resolution is appended as `--res WxH`.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// This executable's `worker` subcommand, forwarding the config path.
    pub fn current_exe(config: Option<PathBuf>) -> std::io::Result<Self> {
        let mut command = Self::new(std::env::current_exe()?).arg("worker");
        if let Some(path) = config {
            command = command.arg("--config").arg(path);
        }
        Ok(command)
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Full argument list for a resolution.
    pub fn args_for(&self, resolution: Resolution) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .chain(["--res".to_string(), resolution.to_string()])
            .collect()
    }

    fn spawn(&self, resolution: Resolution) -> Result<WorkerHandle, SupervisorError> {
        let args = self.args_for(resolution);
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg("--res")
            .arg(resolution.to_string())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| SupervisorError::SpawnFailed {
                program: self.program.display().to_string(),
                source,
            })?;
        Ok(WorkerHandle::new(child, resolution, args))
    }
}

/// Result of a successful launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launched {
    pub pid: u32,
    /// How the previous worker was stopped, if there was one
    pub replaced: Option<TerminateOutcome>,
}

pub struct Supervisor {
    command: WorkerCommand,
    display: DisplayConfigurator,
    grace_period: Duration,
    current: Option<WorkerHandle>,
}

impl Supervisor {
    pub fn new(command: WorkerCommand, display: DisplayConfigurator, grace_period: Duration) -> Self {
        Self {
            command,
            display,
            grace_period,
            current: None,
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn current(&self) -> Option<&WorkerHandle> {
        self.current.as_ref()
    }

    /// Start a worker for `resolution`, replacing any running one.
    ///
    /// The previous worker is fully stopped before the display is touched or
    /// the new worker is spawned. Display reconfiguration is best effort.
    pub fn launch(&mut self, resolution: Resolution) -> Result<Launched, SupervisorError> {
        let replaced = self.terminate_current()?;

        if let Err(e) = self.display.apply(resolution) {
            log::warn!("Display reconfiguration failed: {}", e);
        }

        let handle = self.command.spawn(resolution)?;
        let pid = handle.pid();
        log::info!("Launched worker {} at {}", pid, resolution);
        self.current = Some(handle);
        Ok(Launched { pid, replaced })
    }

    /// Whether the current worker is still running.
    pub fn is_alive(&mut self) -> bool {
        self.current.as_mut().map_or(false, |h| h.is_alive())
    }

    /// Stop the current worker, if any. The handle is dropped once
    /// termination is confirmed.
    pub fn terminate_current(&mut self) -> Result<Option<TerminateOutcome>, SupervisorError> {
        let Some(mut handle) = self.current.take() else {
            return Ok(None);
        };
        match handle.terminate(self.grace_period) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                // Keep the handle so a later call can retry
                self.current = Some(handle);
                Err(e)
            }
        }
    }

    /// Forget a worker that exited on its own. Returns its exit status the
    /// first time the exit is observed.
    pub fn reap(&mut self) -> Option<ExitStatus> {
        let handle = self.current.as_mut()?;
        if handle.is_alive() {
            return None;
        }
        let status = match handle.liveness() {
            Liveness::Exited(status) => status,
            Liveness::Running => return None,
        };
        log::info!("Worker {} exited ({})", handle.pid(), status);
        self.current = None;
        Some(status)
    }

    /// Stop the current worker, logging instead of returning errors.
    pub fn shutdown(&mut self) {
        match self.terminate_current() {
            Ok(Some(outcome)) if outcome.was_killed() => {
                log::warn!("Worker had to be killed during shutdown")
            }
            Ok(_) => {}
            Err(e) => log::error!("{}", e),
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
