//! The magnifier render loop.

use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;

use super::crop::{crop_rect, magnify, CropRect};
use super::fps::{FrameRateSample, DEFAULT_FPS_WINDOW};
use super::overlay::draw_fps;
use crate::camera::{CameraError, FrameSource};
use crate::command::KeyMap;
use crate::error::ErrorClass;
use crate::present::{PresentError, PresentationSink};
use crate::zoom::WorkerState;

/// Errors that end the render loop.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No frame captured: {0}")]
    NoFrame(#[source] CameraError),

    #[error(transparent)]
    Present(#[from] PresentError),

    #[error("Magnifier already shut down")]
    ShutDown,
}

impl EngineError {
    pub fn error_class(&self) -> ErrorClass {
        ErrorClass::FatalResource
    }
}

/// Why the render loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Quit came from a key binding, the keypad or a termination signal
    QuitRequested,
    /// The presentation surface was closed
    SurfaceClosed,
}

/// Render options.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Draw the frame rate into each frame
    pub overlay: bool,
    /// Frames per frame-rate window
    pub fps_window: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            overlay: false,
            fps_window: DEFAULT_FPS_WINDOW,
        }
    }
}

/// One magnified frame ready for presentation.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub image: RgbImage,
    pub zoom: f64,
    pub crop: CropRect,
    pub fps: f64,
}

/// Owns the frame source and the presentation surface for one worker.
///
/// Both are released by [`Magnifier::shutdown`] (also run on drop): the
/// camera first, then the surface.
pub struct Magnifier<S: FrameSource, P: PresentationSink> {
    source: Option<S>,
    sink: Option<P>,
    state: Arc<WorkerState>,
    surface_keys: KeyMap,
    fps: FrameRateSample,
    options: EngineOptions,
}

impl<S: FrameSource, P: PresentationSink> Magnifier<S, P> {
    /// `surface_keys` are the bindings honoured on the surface itself.
    pub fn new(
        source: S,
        sink: P,
        state: Arc<WorkerState>,
        surface_keys: KeyMap,
        options: EngineOptions,
    ) -> Self {
        log::info!("Magnifying {} onto {}", source.describe(), sink.describe());
        Self {
            source: Some(source),
            sink: Some(sink),
            state,
            surface_keys,
            fps: FrameRateSample::new(options.fps_window, Instant::now()),
            options,
        }
    }

    pub fn state(&self) -> &Arc<WorkerState> {
        &self.state
    }

    pub fn sink(&self) -> Option<&P> {
        self.sink.as_ref()
    }

    /// Current frame rate estimate.
    pub fn fps(&self) -> f64 {
        self.fps.rate()
    }

    /// Read one frame and magnify it around its center.
    pub fn render_next_frame(&mut self, zoom: f64) -> Result<RenderedFrame, EngineError> {
        let source = self.source.as_mut().ok_or(EngineError::ShutDown)?;
        let frame = source.read_frame().map_err(EngineError::NoFrame)?;

        let crop = crop_rect(frame.width(), frame.height(), zoom);
        let image = magnify(&frame.image, zoom);
        let fps = self.fps.record(Instant::now());

        Ok(RenderedFrame {
            image,
            zoom,
            crop,
            fps,
        })
    }

    /// Run until quit is requested, the surface closes, or a frame read fails.
    ///
    /// Quit is checked before every frame, so a quit from any thread stops
    /// the loop before the next camera read.
    pub fn run(&mut self) -> Result<ExitReason, EngineError> {
        loop {
            if self.state.quit_requested() {
                return Ok(ExitReason::QuitRequested);
            }
            let sink_open = self.sink.as_ref().map_or(false, |s| s.is_open());
            if !sink_open {
                log::info!("Presentation surface closed");
                self.state.request_quit();
                return Ok(ExitReason::SurfaceClosed);
            }

            let zoom = self.state.zoom.get();
            let mut rendered = match self.render_next_frame(zoom) {
                Ok(r) => r,
                Err(e) => {
                    log::error!("{}", e);
                    return Err(e);
                }
            };

            let overlay = self.options.overlay.then_some(rendered.fps);
            if let Some(rate) = overlay {
                draw_fps(&mut rendered.image, rate);
            }

            let sink = self.sink.as_mut().ok_or(EngineError::ShutDown)?;
            sink.present(&rendered.image, overlay)?;
            for key in sink.pressed_keys() {
                if let Some(command) = self.surface_keys.lookup(key) {
                    self.state.apply(command);
                }
            }
        }
    }

    /// Release the camera, then tear down the surface. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(source) = self.source.take() {
            let name = source.describe();
            drop(source);
            log::info!("Released {}", name);
        }
        if let Some(sink) = self.sink.take() {
            let name = sink.describe();
            drop(sink);
            log::info!("Closed {}", name);
        }
    }
}

impl<S: FrameSource, P: PresentationSink> Drop for Magnifier<S, P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Resolution, TestPattern};
    use crate::command::InputKey;
    use crate::present::HeadlessSink;
    use crate::zoom::ZoomLimits;

    fn magnifier(
        source: TestPattern,
        sink: HeadlessSink,
    ) -> Magnifier<TestPattern, HeadlessSink> {
        Magnifier::new(
            source,
            sink,
            Arc::new(WorkerState::new(ZoomLimits::default())),
            KeyMap::magnifier(),
            EngineOptions::default(),
        )
    }

    #[test]
    fn test_render_identity_dimensions() {
        let mut m = magnifier(TestPattern::new(Resolution::new(64, 36)), HeadlessSink::new());
        let rendered = m.render_next_frame(1.0).unwrap();
        assert_eq!(rendered.image.dimensions(), (64, 36));
        assert!(rendered.crop.is_full(64, 36));
    }

    #[test]
    fn test_render_zoomed_keeps_dimensions() {
        let mut m = magnifier(TestPattern::new(Resolution::new(64, 36)), HeadlessSink::new());
        let rendered = m.render_next_frame(3.0).unwrap();
        assert_eq!(rendered.image.dimensions(), (64, 36));
        assert_eq!(rendered.crop.width, 21);
    }

    #[test]
    fn test_run_stops_when_surface_closes() {
        let mut m = magnifier(
            TestPattern::new(Resolution::new(16, 9)),
            HeadlessSink::new().close_after(5),
        );
        assert_eq!(m.run().unwrap(), ExitReason::SurfaceClosed);
        assert_eq!(m.sink().unwrap().presented(), 5);
        assert!(m.state().quit_requested());
    }

    #[test]
    fn test_run_applies_surface_keys() {
        let sink = HeadlessSink::new()
            .press_after(1, InputKey::Equal)
            .press_after(2, InputKey::Equal)
            .press_after(3, InputKey::Char('q'));
        let mut m = magnifier(TestPattern::new(Resolution::new(16, 9)), sink);
        assert_eq!(m.run().unwrap(), ExitReason::QuitRequested);
        assert_eq!(m.state().zoom.get(), 1.2);
        assert_eq!(m.sink().unwrap().presented(), 3);
    }

    #[test]
    fn test_frame_failure_ends_loop() {
        let mut m = magnifier(
            TestPattern::new(Resolution::new(16, 9)).with_frame_limit(3),
            HeadlessSink::new(),
        );
        let err = m.run().unwrap_err();
        assert!(matches!(err, EngineError::NoFrame(_)));
        assert!(err.error_class().is_fatal());
        assert_eq!(m.sink().unwrap().presented(), 3);
    }

    #[test]
    fn test_quit_before_first_frame() {
        let m_state = Arc::new(WorkerState::default());
        m_state.request_quit();
        let mut m = Magnifier::new(
            TestPattern::new(Resolution::new(16, 9)),
            HeadlessSink::new(),
            m_state,
            KeyMap::magnifier(),
            EngineOptions::default(),
        );
        assert_eq!(m.run().unwrap(), ExitReason::QuitRequested);
        assert_eq!(m.sink().unwrap().presented(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut m = magnifier(TestPattern::new(Resolution::new(8, 8)), HeadlessSink::new());
        m.shutdown();
        m.shutdown();
        assert!(m.sink().is_none());
        assert!(matches!(m.render_next_frame(1.0), Err(EngineError::ShutDown)));
    }

    #[test]
    fn test_overlay_reports_fps_to_sink() {
        let mut m = Magnifier::new(
            TestPattern::new(Resolution::new(32, 18)),
            HeadlessSink::new().close_after(12),
            Arc::new(WorkerState::default()),
            KeyMap::magnifier(),
            EngineOptions {
                overlay: true,
                fps_window: 10,
            },
        );
        m.run().unwrap();
        assert!(m.sink().unwrap().last_fps().is_some());
    }
}
