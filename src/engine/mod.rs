//! Magnification engine: center crop, resize, frame-rate accounting and the
//! render loop that ties a frame source to a presentation surface.

mod crop;
mod fps;
mod overlay;
mod render;

pub use crop::{crop_rect, magnify, CropRect};
pub use fps::{FrameRateSample, DEFAULT_FPS_WINDOW};
pub use overlay::{draw_fps, draw_text, fps_label};
pub use render::{EngineError, EngineOptions, ExitReason, Magnifier, RenderedFrame};
