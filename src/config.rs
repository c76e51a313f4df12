//! Configuration file handling for the magnifier.
//!
//! Loads configuration from `<config_dir>/magnifier/config.toml` or a custom
//! path. Several defaults follow the deployment mode: a production appliance
//! reconfigures the display, monitors the keypad, reads physical input and
//! presents full screen; a development machine does none of that.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::{CameraSettings, Resolution, SourceKind};
use crate::input::{InputMode, PhysicalBackend};
use crate::monitor::{DEFAULT_POLL_INTERVAL, DEFAULT_QUERY_TIMEOUT};
use crate::supervisor::DEFAULT_GRACE_PERIOD;
use crate::zoom::{ZoomLimits, DEFAULT_MAX_ZOOM, DEFAULT_ZOOM_STEP, ZOOM_RESOLUTION};

/// Largest accepted `zoom.max`.
pub const ZOOM_MAX_LIMIT: f64 = 16.0;

/// Where the appliance runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    #[default]
    Development,
    Production,
}

impl Deployment {
    pub fn is_production(self) -> bool {
        self == Deployment::Production
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub appliance: ApplianceConfig,
    #[serde(default)]
    pub zoom: ZoomConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub keypad: KeypadConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default = "default_profiles")]
    pub profiles: Vec<ProfileConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ApplianceConfig {
    #[serde(default)]
    pub deployment: Deployment,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ZoomConfig {
    #[serde(default = "default_max_zoom")]
    pub max: f64,
    #[serde(default = "default_zoom_step")]
    pub step: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default)]
    pub reconfigure: Option<bool>,
    /// Treat closing the launcher (Ctrl+C) as quit
    #[serde(default = "default_true")]
    pub intercept_window_close: bool,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub overlay: bool,
    #[serde(default)]
    pub fullscreen: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub mode: Option<InputMode>,
    #[serde(default = "default_device")]
    pub device: PathBuf,
    #[serde(default)]
    pub backend: PhysicalBackend,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KeypadConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,
    #[serde(default)]
    pub monitoring: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_grace_period")]
    pub grace_period_ms: u64,
    #[serde(default)]
    pub camera: u32,
    #[serde(default)]
    pub source: SourceKind,
}

/// A launchable resolution profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub name: String,
    pub resolution: Resolution,
    #[serde(default)]
    pub key: Option<char>,
}

fn default_true() -> bool {
    true
}

fn default_max_zoom() -> f64 {
    DEFAULT_MAX_ZOOM
}

fn default_zoom_step() -> f64 {
    DEFAULT_ZOOM_STEP
}

fn default_output() -> String {
    "HDMI-1".to_string()
}

fn default_title() -> String {
    "Magnifier".to_string()
}

fn default_device() -> PathBuf {
    PathBuf::from("/dev/input/event0")
}

fn default_address() -> String {
    "E4:5F:01:96:5F:8F".to_string()
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_query_timeout() -> u64 {
    DEFAULT_QUERY_TIMEOUT.as_millis() as u64
}

fn default_grace_period() -> u64 {
    DEFAULT_GRACE_PERIOD.as_millis() as u64
}

fn default_profiles() -> Vec<ProfileConfig> {
    vec![
        ProfileConfig {
            name: "High Resolution (Reading)".to_string(),
            resolution: Resolution::HIGH,
            key: Some('h'),
        },
        ProfileConfig {
            name: "Low Resolution (Embroidery)".to_string(),
            resolution: Resolution::LOW,
            key: Some('l'),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            appliance: ApplianceConfig::default(),
            zoom: ZoomConfig::default(),
            display: DisplayConfig::default(),
            input: InputConfig::default(),
            keypad: KeypadConfig::default(),
            worker: WorkerConfig::default(),
            profiles: default_profiles(),
        }
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            max: default_max_zoom(),
            step: default_zoom_step(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            reconfigure: None,
            intercept_window_close: true,
            title: default_title(),
            overlay: false,
            fullscreen: None,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mode: None,
            device: default_device(),
            backend: PhysicalBackend::default(),
        }
    }
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            poll_interval_secs: default_poll_interval(),
            query_timeout_ms: default_query_timeout(),
            monitoring: None,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period(),
            camera: 0,
            source: SourceKind::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// A missing file at the default location yields the default config; a
    /// missing file at an explicit path is an error, as is a file that
    /// cannot be parsed or holds out-of-range values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_path(), false),
        };

        if !explicit && !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        config
            .validate()
            .map_err(|message| ConfigError::Invalid { path, message })?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        ZoomLimits::new(self.zoom.max, self.zoom.step)?;
        if self.zoom.max <= 1.0 || self.zoom.max > ZOOM_MAX_LIMIT {
            return Err(format!(
                "zoom.max must be in (1.0, {}], got {}",
                ZOOM_MAX_LIMIT, self.zoom.max
            ));
        }
        if self.zoom.step > 1.0 {
            return Err(format!(
                "zoom.step must be in [{}, 1], got {}",
                ZOOM_RESOLUTION, self.zoom.step
            ));
        }
        if self.keypad.poll_interval_secs == 0 {
            return Err("keypad.poll_interval_secs must be at least 1".to_string());
        }
        if self.profiles.is_empty() {
            return Err("at least one profile is required".to_string());
        }
        Ok(())
    }

    pub fn deployment(&self) -> Deployment {
        self.appliance.deployment
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits::new(self.zoom.max, self.zoom.step).unwrap_or_default()
    }

    pub fn reconfigure_display(&self) -> bool {
        self.display
            .reconfigure
            .unwrap_or_else(|| self.deployment().is_production())
    }

    pub fn fullscreen(&self) -> bool {
        self.display
            .fullscreen
            .unwrap_or_else(|| self.deployment().is_production())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.keypad
            .monitoring
            .unwrap_or_else(|| self.deployment().is_production())
    }

    pub fn input_mode(&self) -> InputMode {
        self.input.mode.unwrap_or(if self.deployment().is_production() {
            InputMode::Physical
        } else {
            InputMode::Local
        })
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.worker.grace_period_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.keypad.poll_interval_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.keypad.query_timeout_ms)
    }

    pub fn camera_settings(&self, resolution: Resolution) -> CameraSettings {
        CameraSettings {
            device_index: self.worker.camera,
            resolution,
            ..CameraSettings::default()
        }
    }

    /// Launch keys of the profiles, in order.
    pub fn profile_keys(&self) -> Vec<Option<char>> {
        self.profiles.iter().map(|p| p.key).collect()
    }

    /// Copy with every deployment-dependent default written out.
    pub fn effective(&self) -> Config {
        let mut config = self.clone();
        config.display.reconfigure = Some(self.reconfigure_display());
        config.display.fullscreen = Some(self.fullscreen());
        config.input.mode = Some(self.input_mode());
        config.keypad.monitoring = Some(self.monitoring_enabled());
        config
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid {
        path: PathBuf,
        message: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Invalid { path, message } => {
                write!(f, "Invalid config file '{}': {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("magnifier").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/magnifier/config.toml")
        })
}

/// Commented default file written by `magnifier config init`.
pub const DEFAULT_CONFIG: &str = r#"# magnifier configuration

[appliance]
# "development" or "production". Production reconfigures the display,
# monitors the keypad, reads physical input and runs full screen.
deployment = "development"

[zoom]
max = 3.0
step = 0.1

[display]
# xrandr output switched to the profile resolution
output = "HDMI-1"
# reconfigure = true
# Ctrl+C in the launcher quits (stopping the worker first)
intercept_window_close = true
title = "Magnifier"
# Draw the frame rate into the picture
overlay = false
# fullscreen = true

[input]
# "local" (keyboard on the window) or "physical" (keypad)
# mode = "physical"
device = "/dev/input/event0"
# "event-device" or "global"
backend = "event-device"

[keypad]
address = "E4:5F:01:96:5F:8F"
poll_interval_secs = 10
query_timeout_ms = 3000
# monitoring = true

[worker]
grace_period_ms = 2000
camera = 0
# "camera" or "test-pattern"
source = "camera"

[[profiles]]
name = "High Resolution (Reading)"
resolution = "1280x720"
key = "h"

[[profiles]]
name = "Low Resolution (Embroidery)"
resolution = "800x450"
key = "l"
"#;
