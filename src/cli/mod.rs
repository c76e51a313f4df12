//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction, LauncherArgs, WorkerArgs};
pub use commands::{
    apply_launcher_args, handle_config_action, init_config, list_cameras, list_profiles,
    worker_options,
};
pub use enums::{Backend, DeploymentMode, Input};
