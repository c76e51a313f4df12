//! Camera types and data structures.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use image::RgbImage;

use crate::error::ErrorClass;

/// Information about an available camera device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    /// Device description
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Output resolution of a profile, written `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Reading profile (1280x720)
    pub const HIGH: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    /// Embroidery profile (800x450)
    pub const LOW: Resolution = Resolution {
        width: 800,
        height: 450,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::LOW
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(|| {
            format!(
                "Invalid resolution format '{}'. Use WIDTHxHEIGHT (e.g., 1280x720)",
                s
            )
        })?;
        let width: u32 = w
            .parse()
            .map_err(|_| format!("Invalid width '{}' in resolution", w))?;
        let height: u32 = h
            .parse()
            .map_err(|_| format!("Invalid height '{}' in resolution", h))?;
        if width == 0 || height == 0 {
            return Err("Resolution width and height must be greater than 0".to_string());
        }
        if width > 7680 || height > 4320 {
            return Err("Resolution exceeds maximum supported (7680x4320)".to_string());
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.to_string()
    }
}

/// A captured camera frame. Lives for one render iteration.
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGB pixels
    pub image: RgbImage,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Settings for camera capture.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Camera device index
    pub device_index: u32,
    /// Requested capture resolution (actual may differ)
    pub resolution: Resolution,
    /// Target FPS (actual may vary)
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            resolution: Resolution::default(),
            fps: 30,
        }
    }
}

/// Errors that can occur during camera operations.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),

    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    #[error("Camera permission denied. Check that the user is in the 'video' group")]
    PermissionDenied,

    #[error("Camera device {0} not found. Run 'magnifier cameras' to see available devices")]
    DeviceNotFound(u32),

    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),

    #[error("No frame captured: {0}")]
    NoFrame(String),

    #[error("Camera support not compiled in (rebuild with --features camera)")]
    Unsupported,
}

impl CameraError {
    pub fn error_class(&self) -> ErrorClass {
        ErrorClass::FatalResource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_info_display() {
        let info = CameraInfo {
            index: 0,
            name: "Test Camera".to_string(),
            description: "USB".to_string(),
        };
        assert_eq!(format!("{}", info), "[0] Test Camera (USB)");
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!("1280x720".parse::<Resolution>().unwrap(), Resolution::HIGH);
        assert_eq!("800X450".parse::<Resolution>().unwrap(), Resolution::LOW);
        assert_eq!(" 640x480 ".parse::<Resolution>().unwrap(), Resolution::new(640, 480));
    }

    #[test]
    fn test_resolution_parse_errors() {
        assert!("1280".parse::<Resolution>().unwrap_err().contains("WIDTHxHEIGHT"));
        assert!("axb".parse::<Resolution>().unwrap_err().contains("width"));
        assert!("10x".parse::<Resolution>().unwrap_err().contains("height"));
        assert!("0x720".parse::<Resolution>().is_err());
        assert!("10000x720".parse::<Resolution>().unwrap_err().contains("maximum"));
    }

    #[test]
    fn test_resolution_display_round_trips_argument() {
        assert_eq!(Resolution::HIGH.to_string(), "1280x720");
    }

    #[test]
    fn test_camera_settings_default() {
        let settings = CameraSettings::default();
        assert_eq!(settings.device_index, 0);
        assert_eq!(settings.resolution, Resolution::LOW);
        assert_eq!(settings.fps, 30);
    }

    #[test]
    fn test_camera_errors_are_fatal() {
        assert!(CameraError::NoFrame("eof".into()).error_class().is_fatal());
        assert!(format!("{}", CameraError::DeviceNotFound(5)).contains("5"));
    }

    #[test]
    fn test_frame_dimensions() {
        let frame = Frame::new(RgbImage::new(4, 2));
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
    }
}
