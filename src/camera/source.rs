//! Frame source capability and the synthetic test pattern.

use image::{Rgb, RgbImage};

use super::types::{CameraError, CameraSettings, Frame, Resolution};

/// Something that yields camera frames.
///
/// Implementations release their device when dropped, so the render loop
/// frees the camera on every exit path simply by dropping the source.
pub trait FrameSource {
    /// Human-readable description for log lines.
    fn describe(&self) -> String;

    /// Actual frame size delivered by the source.
    fn resolution(&self) -> Resolution;

    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame, CameraError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        (**self).read_frame()
    }
}

/// Which frame source the worker opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Physical camera (requires the `camera` feature)
    #[default]
    Camera,
    /// Synthetic moving gradient, for development without a camera
    TestPattern,
}

/// Open the configured frame source.
pub fn open_source(
    kind: SourceKind,
    settings: &CameraSettings,
) -> Result<Box<dyn FrameSource>, CameraError> {
    match kind {
        SourceKind::TestPattern => Ok(Box::new(TestPattern::new(settings.resolution))),
        SourceKind::Camera => open_camera(settings),
    }
}

#[cfg(feature = "camera")]
fn open_camera(settings: &CameraSettings) -> Result<Box<dyn FrameSource>, CameraError> {
    Ok(Box::new(super::device::NokhwaCamera::open(settings)?))
}

#[cfg(not(feature = "camera"))]
fn open_camera(_settings: &CameraSettings) -> Result<Box<dyn FrameSource>, CameraError> {
    Err(CameraError::Unsupported)
}

/// Diagonal gradient with a crosshair at the center, shifting each frame.
///
/// The crosshair makes center-anchored magnification easy to see. An optional
/// frame limit simulates a camera that stops delivering frames.
#[derive(Debug)]
pub struct TestPattern {
    resolution: Resolution,
    tick: u32,
    remaining: Option<u32>,
}

impl TestPattern {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            tick: 0,
            remaining: None,
        }
    }

    /// Fail with `NoFrame` after `frames` successful reads.
    pub fn with_frame_limit(mut self, frames: u32) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl FrameSource for TestPattern {
    fn describe(&self) -> String {
        format!("test pattern {}", self.resolution)
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(CameraError::NoFrame("test pattern exhausted".to_string()));
            }
            *remaining -= 1;
        }

        let Resolution { width, height } = self.resolution;
        let (cx, cy) = (width / 2, height / 2);
        let shift = self.tick;
        self.tick = self.tick.wrapping_add(1);

        let image = RgbImage::from_fn(width, height, |x, y| {
            if x == cx || y == cy {
                return Rgb([255, 0, 0]);
            }
            let r = (x.wrapping_add(shift) % width * 255 / width) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) % 256) as u8;
            Rgb([r, g, b])
        });
        Ok(Frame::new(image))
    }
}
