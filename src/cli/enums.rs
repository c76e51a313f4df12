//! CLI enum types for input mode, keypad backend and deployment.

use clap::ValueEnum;

use crate::config::Deployment;
use crate::input::{InputMode, PhysicalBackend};

/// Where zoom and launch commands come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Input {
    /// Keyboard on the magnifier window or launcher terminal
    Local,
    /// Physical keypad
    Physical,
}

impl From<Input> for InputMode {
    fn from(i: Input) -> Self {
        match i {
            Input::Local => InputMode::Local,
            Input::Physical => InputMode::Physical,
        }
    }
}

/// How the physical keypad is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Input device node (see --device)
    EventDevice,
    /// Global keyboard listener
    Global,
}

impl From<Backend> for PhysicalBackend {
    fn from(b: Backend) -> Self {
        match b {
            Backend::EventDevice => PhysicalBackend::EventDevice,
            Backend::Global => PhysicalBackend::Global,
        }
    }
}

/// Deployment mode override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeploymentMode {
    Development,
    Production,
}

impl From<DeploymentMode> for Deployment {
    fn from(d: DeploymentMode) -> Self {
        match d {
            DeploymentMode::Development => Deployment::Development,
            DeploymentMode::Production => Deployment::Production,
        }
    }
}
