//! Best-effort physical display reconfiguration.

use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::camera::Resolution;
use crate::error::ErrorClass;

/// How long the display command may run before it is killed.
pub const DEFAULT_DISPLAY_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("Failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

impl DisplayError {
    pub fn error_class(&self) -> ErrorClass {
        ErrorClass::BestEffortConfig
    }
}

/// What [`DisplayConfigurator::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayChange {
    Applied,
    /// Reconfiguration is disabled (development)
    Skipped,
}

/// Switches the output mode with `xrandr --output <output> --mode WxH`.
///
/// The command is killed if it runs longer than the timeout, so a hung
/// display server cannot stall the caller.
#[derive(Debug, Clone)]
pub struct DisplayConfigurator {
    program: String,
    output: String,
    enabled: bool,
    timeout: Duration,
}

impl DisplayConfigurator {
    pub fn new(output: impl Into<String>, enabled: bool) -> Self {
        Self {
            program: "xrandr".to_string(),
            output: output.into(),
            enabled,
            timeout: DEFAULT_DISPLAY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a different program with the same arguments.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn apply(&self, resolution: Resolution) -> Result<DisplayChange, DisplayError> {
        if !self.enabled {
            log::info!("[DEV] Skipping HDMI reconfiguration, keeping current display");
            return Ok(DisplayChange::Skipped);
        }

        let mode = resolution.to_string();
        let mut child = Command::new(&self.program)
            .args(["--output", &self.output, "--mode", &mode])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DisplayError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let wait_error = |source: std::io::Error| DisplayError::Wait {
            program: self.program.clone(),
            source,
        };
        let deadline = Instant::now() + self.timeout;
        while child.try_wait().map_err(wait_error)?.is_none() {
            let now = Instant::now();
            if now >= deadline {
                log::warn!("{} hung, killing it", self.program);
                let _ = child.kill();
                let _ = child.wait();
                return Err(DisplayError::TimedOut {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
        let output = child.wait_with_output().map_err(wait_error)?;

        if !output.status.success() {
            return Err(DisplayError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        log::info!("Display {} set to {}", self.output, mode);
        Ok(DisplayChange::Applied)
    }
}
