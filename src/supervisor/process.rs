//! Worker process handle and the graceful-stop/forced-kill protocol.

use std::io;
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use super::SupervisorError;
use crate::camera::Resolution;

/// Grace period observed on the appliance.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The operations the supervisor needs from a child process.
pub trait ChildProcess: Send {
    fn id(&self) -> u32;

    /// Non-blocking exit check.
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;

    /// Ask the process to stop (SIGTERM on unix).
    fn request_stop(&mut self) -> io::Result<()>;

    /// Forced termination.
    fn kill(&mut self) -> io::Result<()>;

    fn wait(&mut self) -> io::Result<ExitStatus>;
}

impl ChildProcess for Child {
    fn id(&self) -> u32 {
        Child::id(self)
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        Child::try_wait(self)
    }

    #[cfg(unix)]
    fn request_stop(&mut self) -> io::Result<()> {
        let pid = Child::id(self) as libc::pid_t;
        // SAFETY: kill(2) has no memory-safety preconditions; the pid belongs
        // to a child we have not reaped yet.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn request_stop(&mut self) -> io::Result<()> {
        // No graceful signal available
        Child::kill(self)
    }

    fn kill(&mut self) -> io::Result<()> {
        Child::kill(self)
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        Child::wait(self)
    }
}

/// Liveness of a launched worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,
    Exited(ExitStatus),
}

/// How a call to [`WorkerHandle::terminate`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// The worker was already gone; nothing was sent.
    AlreadyExited,
    /// The worker stopped within the grace period.
    Stopped(ExitStatus),
    /// The grace period elapsed and the worker was killed.
    Killed(ExitStatus),
}

impl TerminateOutcome {
    pub fn was_killed(&self) -> bool {
        matches!(self, TerminateOutcome::Killed(_))
    }
}

/// Supervisor-side reference to one spawned worker.
pub struct WorkerHandle<C: ChildProcess = Child> {
    child: C,
    resolution: Resolution,
    args: Vec<String>,
    liveness: Liveness,
}

impl<C: ChildProcess> WorkerHandle<C> {
    pub fn new(child: C, resolution: Resolution, args: Vec<String>) -> Self {
        Self {
            child,
            resolution,
            args,
            liveness: Liveness::Running,
        }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Arguments the worker was launched with.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn child(&self) -> &C {
        &self.child
    }

    /// Refresh liveness without blocking. A failed status query counts as
    /// still running.
    pub fn is_alive(&mut self) -> bool {
        if let Liveness::Exited(_) = self.liveness {
            return false;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.liveness = Liveness::Exited(status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                log::warn!("Could not query worker {}: {}", self.pid(), e);
                true
            }
        }
    }

    /// Ask the worker to stop, wait up to `grace`, then kill it.
    ///
    /// The forced kill is issued at most once. Calling this on a worker that
    /// has already exited does nothing.
    pub fn terminate(&mut self, grace: Duration) -> Result<TerminateOutcome, SupervisorError> {
        if !self.is_alive() {
            return Ok(TerminateOutcome::AlreadyExited);
        }

        let pid = self.pid();
        log::info!("Stopping worker {}", pid);
        if let Err(e) = self.child.request_stop() {
            // Usually means it exited between the check and the signal
            log::debug!("Stop request to worker {} failed: {}", pid, e);
        }

        let start = Instant::now();
        loop {
            match self.child.try_wait().map_err(SupervisorError::Wait)? {
                Some(status) => {
                    self.liveness = Liveness::Exited(status);
                    log::info!("Worker {} stopped ({})", pid, status);
                    return Ok(TerminateOutcome::Stopped(status));
                }
                None => {
                    let elapsed = start.elapsed();
                    if elapsed >= grace {
                        break;
                    }
                    thread::sleep(POLL_INTERVAL.min(grace - elapsed));
                }
            }
        }

        log::warn!(
            "Worker {} did not exit within grace period ({:?}), killing",
            pid,
            grace
        );
        self.child.kill().map_err(SupervisorError::Kill)?;
        let status = self.child.wait().map_err(SupervisorError::Wait)?;
        self.liveness = Liveness::Exited(status);
        Ok(TerminateOutcome::Killed(status))
    }
}
