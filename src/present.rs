//! Presentation surfaces for magnified frames.
//!
//! The render loop only talks to [`PresentationSink`]; a full-screen window
//! and a headless surface implement it, so one engine serves every
//! presentation backend.

use std::collections::{BTreeMap, VecDeque};

use image::RgbImage;

use crate::camera::Resolution;
use crate::command::InputKey;
use crate::error::ErrorClass;

/// Errors raised by a presentation surface.
#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("Failed to open window: {0}")]
    OpenFailed(String),

    #[error("Failed to update window: {0}")]
    UpdateFailed(String),

    #[error("Window support not compiled in (rebuild with --features window)")]
    Unsupported,
}

impl PresentError {
    pub fn error_class(&self) -> ErrorClass {
        ErrorClass::FatalResource
    }
}

/// A surface that shows frames and reports keys pressed on it.
pub trait PresentationSink {
    fn describe(&self) -> String;

    /// False once the user closed the surface.
    fn is_open(&self) -> bool;

    /// Show a frame. `fps` is set when the overlay is enabled.
    fn present(&mut self, frame: &RgbImage, fps: Option<f64>) -> Result<(), PresentError>;

    /// Keys pressed on the surface since the last call.
    fn pressed_keys(&mut self) -> Vec<InputKey>;
}

impl<T: PresentationSink + ?Sized> PresentationSink for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn present(&mut self, frame: &RgbImage, fps: Option<f64>) -> Result<(), PresentError> {
        (**self).present(frame, fps)
    }

    fn pressed_keys(&mut self) -> Vec<InputKey> {
        (**self).pressed_keys()
    }
}

/// Which surface the worker presents to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkKind {
    #[default]
    Window,
    Headless,
}

/// Options for creating a surface.
#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    pub title: String,
    pub resolution: Resolution,
    pub fullscreen: bool,
}

/// Create the configured surface.
pub fn open_sink(
    kind: SinkKind,
    options: &SurfaceOptions,
) -> Result<Box<dyn PresentationSink>, PresentError> {
    match kind {
        SinkKind::Headless => Ok(Box::new(HeadlessSink::new())),
        SinkKind::Window => open_window(options),
    }
}

#[cfg(feature = "window")]
fn open_window(options: &SurfaceOptions) -> Result<Box<dyn PresentationSink>, PresentError> {
    Ok(Box::new(window::WindowSink::open(options)?))
}

#[cfg(not(feature = "window"))]
fn open_window(_options: &SurfaceOptions) -> Result<Box<dyn PresentationSink>, PresentError> {
    Err(PresentError::Unsupported)
}

/// Surface without a display. Counts frames, can close itself after a fixed
/// number of frames and can replay scripted key presses.
#[derive(Debug, Default)]
pub struct HeadlessSink {
    presented: u64,
    close_after: Option<u64>,
    scripted: BTreeMap<u64, Vec<InputKey>>,
    pending: VecDeque<InputKey>,
    last_size: Option<(u32, u32)>,
    last_fps: Option<f64>,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the surface as closed once `frames` frames were presented.
    pub fn close_after(mut self, frames: u64) -> Self {
        self.close_after = Some(frames);
        self
    }

    /// Report `key` as pressed right after frame number `frame` (1-based).
    pub fn press_after(mut self, frame: u64, key: InputKey) -> Self {
        self.scripted.entry(frame).or_default().push(key);
        self
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn last_size(&self) -> Option<(u32, u32)> {
        self.last_size
    }

    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }
}

impl PresentationSink for HeadlessSink {
    fn describe(&self) -> String {
        "headless surface".to_string()
    }

    fn is_open(&self) -> bool {
        self.close_after.map_or(true, |limit| self.presented < limit)
    }

    fn present(&mut self, frame: &RgbImage, fps: Option<f64>) -> Result<(), PresentError> {
        self.presented += 1;
        self.last_size = Some(frame.dimensions());
        self.last_fps = fps;
        if let Some(keys) = self.scripted.remove(&self.presented) {
            self.pending.extend(keys);
        }
        Ok(())
    }

    fn pressed_keys(&mut self) -> Vec<InputKey> {
        self.pending.drain(..).collect()
    }
}

#[cfg(feature = "window")]
mod window {
    use image::RgbImage;
    use minifb::{Key, KeyRepeat, ScaleMode, Window, WindowOptions};

    use super::{PresentError, PresentationSink, SurfaceOptions};
    use crate::command::InputKey;
    use crate::engine::fps_label;

    const LETTERS: [(Key, char); 26] = [
        (Key::A, 'a'),
        (Key::B, 'b'),
        (Key::C, 'c'),
        (Key::D, 'd'),
        (Key::E, 'e'),
        (Key::F, 'f'),
        (Key::G, 'g'),
        (Key::H, 'h'),
        (Key::I, 'i'),
        (Key::J, 'j'),
        (Key::K, 'k'),
        (Key::L, 'l'),
        (Key::M, 'm'),
        (Key::N, 'n'),
        (Key::O, 'o'),
        (Key::P, 'p'),
        (Key::Q, 'q'),
        (Key::R, 'r'),
        (Key::S, 's'),
        (Key::T, 't'),
        (Key::U, 'u'),
        (Key::V, 'v'),
        (Key::W, 'w'),
        (Key::X, 'x'),
        (Key::Y, 'y'),
        (Key::Z, 'z'),
    ];

    const DIGITS: [Key; 10] = [
        Key::Key0,
        Key::Key1,
        Key::Key2,
        Key::Key3,
        Key::Key4,
        Key::Key5,
        Key::Key6,
        Key::Key7,
        Key::Key8,
        Key::Key9,
    ];

    const KEYPAD_DIGITS: [Key; 10] = [
        Key::NumPad0,
        Key::NumPad1,
        Key::NumPad2,
        Key::NumPad3,
        Key::NumPad4,
        Key::NumPad5,
        Key::NumPad6,
        Key::NumPad7,
        Key::NumPad8,
        Key::NumPad9,
    ];

    fn input_key(key: Key) -> InputKey {
        match key {
            Key::NumPadPlus => InputKey::KeypadPlus,
            Key::NumPadMinus => InputKey::KeypadMinus,
            Key::NumPadEnter => InputKey::KeypadEnter,
            Key::Equal => InputKey::Equal,
            Key::Minus => InputKey::Minus,
            Key::Escape => InputKey::Escape,
            Key::Enter => InputKey::Enter,
            Key::Up => InputKey::Up,
            Key::Down => InputKey::Down,
            other => {
                if let Some(d) = DIGITS.iter().position(|k| *k == other) {
                    InputKey::Digit(d as u8)
                } else if let Some(d) = KEYPAD_DIGITS.iter().position(|k| *k == other) {
                    InputKey::KeypadDigit(d as u8)
                } else if let Some((_, c)) = LETTERS.iter().find(|(k, _)| *k == other) {
                    InputKey::Char(*c)
                } else {
                    InputKey::Other(other as u32)
                }
            }
        }
    }

    /// minifb window scaled to the display. Borderless when full screen.
    pub struct WindowSink {
        window: Window,
        buffer: Vec<u32>,
        title: String,
        shown_fps: Option<String>,
    }

    impl WindowSink {
        pub fn open(options: &SurfaceOptions) -> Result<Self, PresentError> {
            let window_options = WindowOptions {
                borderless: options.fullscreen,
                topmost: options.fullscreen,
                resize: !options.fullscreen,
                scale_mode: ScaleMode::AspectRatioStretch,
                ..WindowOptions::default()
            };
            let window = Window::new(
                &options.title,
                options.resolution.width as usize,
                options.resolution.height as usize,
                window_options,
            )
            .map_err(|e| PresentError::OpenFailed(e.to_string()))?;

            log::info!("Opened window '{}' at {}", options.title, options.resolution);
            Ok(Self {
                window,
                buffer: Vec::new(),
                title: options.title.clone(),
                shown_fps: None,
            })
        }
    }

    impl PresentationSink for WindowSink {
        fn describe(&self) -> String {
            format!("window '{}'", self.title)
        }

        fn is_open(&self) -> bool {
            self.window.is_open()
        }

        fn present(&mut self, frame: &RgbImage, fps: Option<f64>) -> Result<(), PresentError> {
            let (width, height) = frame.dimensions();
            self.buffer.clear();
            self.buffer.extend(
                frame
                    .pixels()
                    .map(|p| (p[0] as u32) << 16 | (p[1] as u32) << 8 | p[2] as u32),
            );

            if let Some(rate) = fps {
                let label = fps_label(rate);
                if self.shown_fps.as_deref() != Some(label.as_str()) {
                    self.window.set_title(&format!("{} - {}", self.title, label));
                    self.shown_fps = Some(label);
                }
            }

            self.window
                .update_with_buffer(&self.buffer, width as usize, height as usize)
                .map_err(|e| PresentError::UpdateFailed(e.to_string()))
        }

        fn pressed_keys(&mut self) -> Vec<InputKey> {
            self.window
                .get_keys_pressed(KeyRepeat::No)
                .into_iter()
                .map(input_key)
                .collect()
        }
    }

    impl Drop for WindowSink {
        fn drop(&mut self) {
            log::info!("Closing window '{}'", self.title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_counts_and_closes() {
        let mut sink = HeadlessSink::new().close_after(2);
        let frame = RgbImage::new(4, 3);
        assert!(sink.is_open());
        sink.present(&frame, None).unwrap();
        assert!(sink.is_open());
        sink.present(&frame, Some(9.5)).unwrap();
        assert!(!sink.is_open());
        assert_eq!(sink.presented(), 2);
        assert_eq!(sink.last_size(), Some((4, 3)));
        assert_eq!(sink.last_fps(), Some(9.5));
    }

    #[test]
    fn test_headless_scripted_keys() {
        let mut sink = HeadlessSink::new().press_after(2, InputKey::Char('q'));
        let frame = RgbImage::new(1, 1);
        sink.present(&frame, None).unwrap();
        assert!(sink.pressed_keys().is_empty());
        sink.present(&frame, None).unwrap();
        assert_eq!(sink.pressed_keys(), vec![InputKey::Char('q')]);
        assert!(sink.pressed_keys().is_empty());
    }

    #[cfg(not(feature = "window"))]
    #[test]
    fn test_window_without_feature_is_unsupported() {
        let options = SurfaceOptions {
            title: "Magnifier".to_string(),
            resolution: Resolution::LOW,
            fullscreen: false,
        };
        assert!(matches!(
            open_sink(SinkKind::Window, &options),
            Err(PresentError::Unsupported)
        ));
    }
}
