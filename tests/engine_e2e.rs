//! End-to-end tests for the magnification engine.
//!
//! These tests drive the full render loop with the synthetic test pattern
//! and a headless surface:
//! - Crop window stays inside the frame for every zoom step
//! - Identity at 1.0, centered magnification above it
//! - Frame rate is reported once per window
//! - Camera failures end the loop and release resources in order

use std::sync::Arc;
use std::time::{Duration, Instant};

use magnifier::camera::{CameraError, Frame, FrameSource, Resolution, TestPattern};
use magnifier::command::{InputKey, KeyMap};
use magnifier::engine::{crop_rect, magnify, EngineError, EngineOptions, ExitReason, FrameRateSample, Magnifier};
use magnifier::present::{HeadlessSink, PresentationSink};
use magnifier::zoom::{WorkerState, ZoomLimits};

/// Source that records when it is dropped.
struct TrackedSource {
    inner: TestPattern,
    log: Arc<std::sync::Mutex<Vec<&'static str>>>,
}

impl FrameSource for TrackedSource {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn resolution(&self) -> Resolution {
        self.inner.resolution()
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        self.inner.read_frame()
    }
}

impl Drop for TrackedSource {
    fn drop(&mut self) {
        self.log.lock().unwrap().push("camera released");
    }
}

/// Surface that records when it is dropped.
struct TrackedSink {
    inner: HeadlessSink,
    log: Arc<std::sync::Mutex<Vec<&'static str>>>,
}

impl PresentationSink for TrackedSink {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn present(
        &mut self,
        frame: &image::RgbImage,
        fps: Option<f64>,
    ) -> Result<(), magnifier::present::PresentError> {
        self.inner.present(frame, fps)
    }

    fn pressed_keys(&mut self) -> Vec<InputKey> {
        self.inner.pressed_keys()
    }
}

impl Drop for TrackedSink {
    fn drop(&mut self) {
        self.log.lock().unwrap().push("surface closed");
    }
}

#[test]
fn test_crop_bounds_for_every_zoom_step() {
    let limits = ZoomLimits::new(4.0, 0.1).unwrap();
    for (w, h) in [(1280, 720), (800, 450), (641, 479), (3, 3), (1, 1)] {
        for step in 0..=30 {
            let z = limits.clamp(1.0 + step as f64 * limits.step);
            let rect = crop_rect(w, h, z);
            assert!(rect.x < rect.x2() && rect.x2() <= w, "{}x{} at {}", w, h, z);
            assert!(rect.y < rect.y2() && rect.y2() <= h, "{}x{} at {}", w, h, z);
        }
    }
}

#[test]
fn test_identity_and_magnified_dimensions() {
    let mut source = TestPattern::new(Resolution::HIGH);
    let frame = source.read_frame().unwrap();

    let identity = magnify(&frame.image, 1.0);
    assert_eq!(identity.dimensions(), (1280, 720));
    assert_eq!(identity, frame.image);

    let zoomed = magnify(&frame.image, 3.0);
    assert_eq!(zoomed.dimensions(), (1280, 720));
    assert_ne!(zoomed, frame.image);
}

#[test]
fn test_frame_rate_window() {
    let start = Instant::now();
    let mut sample = FrameRateSample::new(10, start);
    for i in 1..=10 {
        sample.record(start + Duration::from_millis(200 * i));
    }
    assert!((sample.rate() - 5.0).abs() < 1e-9);
    assert_eq!(sample.count(), 0);
}

#[test]
fn test_render_loop_runs_until_surface_closes() {
    let state = Arc::new(WorkerState::default());
    let mut magnifier = Magnifier::new(
        TestPattern::new(Resolution::new(160, 90)),
        HeadlessSink::new().close_after(25),
        Arc::clone(&state),
        KeyMap::magnifier(),
        EngineOptions {
            overlay: true,
            fps_window: 10,
        },
    );
    assert_eq!(magnifier.run().unwrap(), ExitReason::SurfaceClosed);
    let sink = magnifier.sink().unwrap();
    assert_eq!(sink.presented(), 25);
    assert_eq!(sink.last_size(), Some((160, 90)));
    assert!(sink.last_fps().unwrap() > 0.0);
    assert!(state.quit_requested());
}

#[test]
fn test_zoom_changes_between_frames() {
    let state = Arc::new(WorkerState::default());
    let sink = HeadlessSink::new()
        .press_after(2, InputKey::KeypadPlus)
        .press_after(4, InputKey::KeypadPlus)
        .press_after(6, InputKey::KeypadDigit(0))
        .press_after(8, InputKey::KeypadMinus)
        .press_after(10, InputKey::Char('q'));
    let mut magnifier = Magnifier::new(
        TestPattern::new(Resolution::new(64, 36)),
        sink,
        Arc::clone(&state),
        KeyMap::magnifier(),
        EngineOptions::default(),
    );
    assert_eq!(magnifier.run().unwrap(), ExitReason::QuitRequested);
    assert_eq!(state.zoom.get(), 1.0);
}

#[test]
fn test_camera_released_before_surface_on_failure() {
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut magnifier = Magnifier::new(
        TrackedSource {
            inner: TestPattern::new(Resolution::new(16, 9)).with_frame_limit(4),
            log: Arc::clone(&log),
        },
        TrackedSink {
            inner: HeadlessSink::new(),
            log: Arc::clone(&log),
        },
        Arc::new(WorkerState::default()),
        KeyMap::magnifier(),
        EngineOptions::default(),
    );
    let err = magnifier.run().unwrap_err();
    assert!(matches!(err, EngineError::NoFrame(CameraError::NoFrame(_))));
    drop(magnifier);
    assert_eq!(*log.lock().unwrap(), ["camera released", "surface closed"]);
}

#[test]
fn test_camera_released_before_surface_on_quit() {
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    let state = Arc::new(WorkerState::default());
    let mut magnifier = Magnifier::new(
        TrackedSource {
            inner: TestPattern::new(Resolution::new(16, 9)),
            log: Arc::clone(&log),
        },
        TrackedSink {
            inner: HeadlessSink::new().press_after(3, InputKey::Escape),
            log: Arc::clone(&log),
        },
        Arc::clone(&state),
        KeyMap::magnifier(),
        EngineOptions::default(),
    );
    assert_eq!(magnifier.run().unwrap(), ExitReason::QuitRequested);
    magnifier.shutdown();
    assert_eq!(*log.lock().unwrap(), ["camera released", "surface closed"]);
}

#[cfg(feature = "camera")]
#[test]
fn test_list_devices_succeeds() {
    let devices = magnifier::camera::list_devices();
    assert!(devices.is_ok(), "list_devices should not error: {:?}", devices.err());
}
