//! Subcommand handlers and command-line overrides.

use std::path::Path;

use super::args::{ConfigAction, LauncherArgs, WorkerArgs};
use crate::camera::{self, SourceKind};
use crate::config::{default_path, Config, DEFAULT_CONFIG};
use crate::input::InputMode;
use crate::present::SinkKind;
use crate::worker::WorkerOptions;
use crate::zoom::ZoomLimits;

/// Apply launcher flags on top of the loaded config.
pub fn apply_launcher_args(args: &LauncherArgs, config: &mut Config) {
    if let Some(input) = args.input {
        config.input.mode = Some(input.into());
    }
    if args.no_monitor {
        config.keypad.monitoring = Some(false);
    }
}

/// Resolve worker options: flag > config file > default.
pub fn worker_options(args: &WorkerArgs, config: &Config) -> Result<WorkerOptions, String> {
    let mut options = WorkerOptions::from_config(config, args.resolution);
    if let Some(input) = args.input {
        options.input_mode = InputMode::from(input);
    }
    if let Some(device) = &args.device {
        options.device = device.clone();
    }
    if let Some(backend) = args.backend {
        options.backend = backend.into();
    }
    if let Some(max) = args.max_zoom {
        options.limits = ZoomLimits::new(max, options.limits.step)?;
    }
    if let Some(index) = args.camera {
        options.camera.device_index = index;
    }
    if args.overlay {
        options.engine.overlay = true;
    }
    if args.headless {
        options.sink = SinkKind::Headless;
    }
    if args.test_pattern {
        options.source = SourceKind::TestPattern;
    }
    Ok(options)
}

/// List available cameras and print them to stdout.
pub fn list_cameras() -> Result<(), String> {
    let devices = camera::list_devices().map_err(|e| e.to_string())?;
    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure the camera is connected and the user is in the 'video' group.");
    } else {
        println!("Available cameras:");
        for device in devices {
            println!("  {}", device);
        }
        println!();
        println!("Set [worker] camera = <index> in the config file to select a camera.");
    }
    Ok(())
}

/// Print the configured profiles with their launch keys.
pub fn list_profiles(config: &Config) {
    println!("Profiles:");
    for (i, profile) in config.profiles.iter().enumerate() {
        let key = profile.key.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {}. {} {} (key: {}, keypad: {})",
            i + 1,
            profile.name,
            profile.resolution,
            key,
            i + 1
        );
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    path: Option<&Path>,
    config: &Config,
) -> Result<(), String> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
    match action {
        ConfigAction::Show => {
            let text = config
                .effective()
                .to_toml()
                .map_err(|e| format!("Failed to render config: {}", e))?;
            if config_path.exists() {
                println!("# Config file: {} (exists)", config_path.display());
            } else {
                println!("# Config file: {} (not found, using defaults)", config_path.display());
            }
            println!();
            print!("{}", text);
            Ok(())
        }
        ConfigAction::Init => {
            init_config(&config_path)?;
            println!("Created config file: {}", config_path.display());
            Ok(())
        }
    }
}

/// Write the default config file, refusing to overwrite an existing one.
pub fn init_config(path: &Path) -> Result<(), String> {
    if path.exists() {
        return Err(format!(
            "Config file already exists: {}. Use 'magnifier config show' to view current settings.",
            path.display()
        ));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Error creating config directory: {}", e))?;
    }
    std::fs::write(path, DEFAULT_CONFIG).map_err(|e| format!("Error writing config file: {}", e))
}
