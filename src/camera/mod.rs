//! Camera access for the magnifier worker.
//!
//! - Frame sources via [`FrameSource`] and [`open_source`]
//! - Device enumeration via [`list_devices`] (requires the `camera` feature)
//! - Configuration via [`CameraSettings`] and [`Resolution`]

#[cfg(feature = "camera")]
mod device;
mod source;
mod types;

#[cfg(feature = "camera")]
pub use device::{list_devices, NokhwaCamera};
pub use source::{open_source, FrameSource, SourceKind, TestPattern};
pub use types::{CameraError, CameraInfo, CameraSettings, Frame, Resolution};

/// List available cameras. Without the `camera` feature there is nothing to list.
#[cfg(not(feature = "camera"))]
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    Err(CameraError::Unsupported)
}
