//! Physical camera backend built on nokhwa.

use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::{query, Camera};

use super::source::FrameSource;
use super::types::{CameraError, CameraInfo, CameraSettings, Frame, Resolution};

/// List all available camera devices on the system.
///
/// If no cameras are found, returns an empty vector (not an error).
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    let devices = query(ApiBackend::Auto).map_err(|e| CameraError::QueryFailed(e.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|d| CameraInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

/// An open camera with a running stream. The stream is stopped on drop.
pub struct NokhwaCamera {
    camera: Camera,
    index: u32,
    resolution: Resolution,
}

impl NokhwaCamera {
    /// Open the camera and start streaming, asking for the profile resolution.
    pub fn open(settings: &CameraSettings) -> Result<Self, CameraError> {
        let index = CameraIndex::Index(settings.device_index);
        let mut camera = open_camera_with_fallback(&index, settings)?;

        camera
            .open_stream()
            .map_err(|e| CameraError::StreamFailed(e.to_string()))?;

        let res = camera.resolution();
        let resolution = Resolution::new(res.width(), res.height());
        log::info!(
            "Camera {} streaming at {} ({} fps requested {})",
            settings.device_index,
            resolution,
            camera.frame_rate(),
            settings.fps
        );

        Ok(Self {
            camera,
            index: settings.device_index,
            resolution,
        })
    }
}

impl FrameSource for NokhwaCamera {
    fn describe(&self) -> String {
        format!("camera {} at {}", self.index, self.resolution)
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CameraError::NoFrame(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::NoFrame(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        let image = RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
            CameraError::NoFrame(format!("decoded buffer does not match {}x{}", width, height))
        })?;
        Ok(Frame::new(image))
    }
}

impl Drop for NokhwaCamera {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::warn!("Failed to stop camera stream: {}", e);
        }
        log::info!("Camera {} released", self.index);
    }
}

/// Try to open a camera with multiple format fallback strategies.
fn open_camera_with_fallback(
    index: &CameraIndex,
    settings: &CameraSettings,
) -> Result<Camera, CameraError> {
    // 1. Closest match with MJPEG (widely supported on USB cameras)
    // 2. Closest match with YUYV (Raspberry Pi camera via v4l2)
    // 3. Let the camera pick whatever format works best
    let target = nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
    let format_attempts = [
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            target,
            NokhwaFrameFormat::MJPEG,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            target,
            NokhwaFrameFormat::YUYV,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
    ];

    let mut last_error = None;
    for requested in format_attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => last_error = Some(e),
        }
    }

    let message = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no format accepted".to_string());
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") {
        Err(CameraError::PermissionDenied)
    } else if lower.contains("not found") || lower.contains("no such") {
        Err(CameraError::DeviceNotFound(settings.device_index))
    } else {
        Err(CameraError::OpenFailed(message))
    }
}
