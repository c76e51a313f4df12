//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{Backend, DeploymentMode, Input};
use crate::camera::Resolution;

/// Parse and validate resolution (WIDTHxHEIGHT format)
fn parse_resolution(s: &str) -> Result<Resolution, String> {
    s.parse()
}

/// Parse and validate maximum zoom (1.0 < max <= 16.0)
fn parse_max_zoom(s: &str) -> Result<f64, String> {
    let max: f64 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(max > 1.0 && max <= crate::config::ZOOM_MAX_LIMIT) {
        return Err(format!(
            "Maximum zoom must be above 1.0 and at most {}, got {}",
            crate::config::ZOOM_MAX_LIMIT,
            max
        ));
    }
    Ok(max)
}

/// Camera magnifier: profile launcher and magnifier worker
#[derive(Parser, Debug)]
#[command(name = "magnifier")]
#[command(version, about = "Live camera magnifier for low-vision reading and handwork", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Override the deployment mode from the config file
    #[arg(long, global = true)]
    pub deployment: Option<DeploymentMode>,

    /// Debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the profile menu and supervise the magnifier (default)
    Launcher(LauncherArgs),
    /// Run the magnifier for one resolution profile
    Worker(WorkerArgs),
    /// List available cameras
    Cameras,
    /// List configured profiles and their keys
    Profiles,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Default, Clone)]
pub struct LauncherArgs {
    /// Where launcher keys come from
    #[arg(long)]
    pub input: Option<Input>,

    /// Skip keypad connectivity checks
    #[arg(long)]
    pub no_monitor: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct WorkerArgs {
    /// Output resolution
    #[arg(long = "res", alias = "resolution", default_value = "800x450", value_parser = parse_resolution)]
    pub resolution: Resolution,

    /// Where zoom keys come from
    #[arg(long)]
    pub input: Option<Input>,

    /// Keypad input device
    #[arg(long)]
    pub device: Option<PathBuf>,

    /// Keypad backend
    #[arg(long)]
    pub backend: Option<Backend>,

    /// Maximum zoom factor
    #[arg(long, value_parser = parse_max_zoom)]
    pub max_zoom: Option<f64>,

    /// Draw the frame rate into the picture
    #[arg(long)]
    pub overlay: bool,

    /// Render without a window (until a termination signal)
    #[arg(long)]
    pub headless: bool,

    /// Use a synthetic test pattern instead of the camera
    #[arg(long)]
    pub test_pattern: bool,

    /// Camera device index (from `magnifier cameras`)
    #[arg(long)]
    pub camera: Option<u32>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Create default config file
    Init,
}
