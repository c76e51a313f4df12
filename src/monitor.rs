//! Device Connectivity Monitor.
//!
//! Each poll runs an external query (`bluetoothctl info <address>`) with a
//! bounded timeout and reduces its output to a [`DeviceStatus`]. Polls are
//! independent; nothing is carried between them.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::ErrorClass;

/// Interval between polls on the appliance.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Upper bound for a single query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Status text shown when monitoring is disabled.
pub const MONITORING_DISABLED: &str = "[DEV] Skipping Bluetooth check";

const CONNECTED_MARKER: &str = "Connected: yes";

/// Result of one connectivity poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// The device reports an active link
    Connected,
    /// The query succeeded but the device has no link
    NotFound,
    /// The query itself failed
    CheckFailed,
}

impl DeviceStatus {
    /// Operator-facing status text.
    pub fn message(&self) -> &'static str {
        match self {
            DeviceStatus::Connected => "Control device connected",
            DeviceStatus::NotFound => "Control device not found. Please check battery.",
            DeviceStatus::CheckFailed => "Error checking device status.",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, DeviceStatus::Connected)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not answer within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("{program} exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },
}

impl MonitorError {
    pub fn error_class(&self) -> ErrorClass {
        ErrorClass::BestEffortConfig
    }
}

/// Reduce the query output to a status. Only called for a successful query.
pub fn parse_status(output: &str) -> DeviceStatus {
    if output.contains(CONNECTED_MARKER) {
        DeviceStatus::Connected
    } else {
        DeviceStatus::NotFound
    }
}

/// An external command that reports the control device's link state.
#[derive(Debug, Clone)]
pub struct ConnectivityQuery {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ConnectivityQuery {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// `bluetoothctl info <address>`
    pub fn bluetoothctl(address: &str, timeout: Duration) -> Self {
        Self::new(
            "bluetoothctl",
            vec!["info".to_string(), address.to_string()],
            timeout,
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the query and return its standard output.
    ///
    /// The child is killed if the timeout elapses.
    pub async fn run(&self) -> Result<String, MonitorError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MonitorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| MonitorError::TimedOut {
                program: self.program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| MonitorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MonitorError::Failed {
                program: self.program.clone(),
                status: output.status,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// One independent poll. Query errors become [`DeviceStatus::CheckFailed`].
    pub async fn poll_once(&self) -> DeviceStatus {
        match self.run().await {
            Ok(output) => parse_status(&output),
            Err(e) => {
                log::warn!("Connectivity check failed: {}", e);
                DeviceStatus::CheckFailed
            }
        }
    }
}
