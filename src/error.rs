//! Error classification shared by every component.
//!
//! Each component owns its own error enum; this module only defines how
//! those errors are treated once they reach the owning loop.

use std::fmt;

/// How an error must be handled by the code that observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Camera cannot be opened or a frame read failed. Ends the worker with a
    /// non-zero exit status.
    FatalResource,
    /// The physical input device is unavailable. Logged; the worker keeps
    /// rendering with zoom frozen.
    DegradedInput,
    /// Display reconfiguration or connectivity query failed. Logged or shown
    /// as status text; never blocks the caller.
    BestEffortConfig,
    /// A child did not exit within its grace period and was killed.
    SupervisionTimeout,
}

impl ErrorClass {
    /// Whether this class must unwind to process exit.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorClass::FatalResource)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::FatalResource => "fatal resource error",
            ErrorClass::DegradedInput => "degraded input",
            ErrorClass::BestEffortConfig => "best-effort configuration error",
            ErrorClass::SupervisionTimeout => "supervision timeout",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_resource_errors_are_fatal() {
        assert!(ErrorClass::FatalResource.is_fatal());
        assert!(!ErrorClass::DegradedInput.is_fatal());
        assert!(!ErrorClass::BestEffortConfig.is_fatal());
        assert!(!ErrorClass::SupervisionTimeout.is_fatal());
    }
}
