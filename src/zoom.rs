//! Shared magnification state for a running worker.
//!
//! The render loop reads the zoom factor every frame while the input
//! listener thread writes it. Both sides hold an `Arc<WorkerState>`; the
//! fields are atomics so neither side ever takes a lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::command::ControlCommand;

/// Lower bound of the zoom factor (no magnification).
pub const MIN_ZOOM: f64 = 1.0;

/// Default upper bound of the zoom factor.
pub const DEFAULT_MAX_ZOOM: f64 = 3.0;

/// Default delta applied by a single zoom-in/zoom-out command.
pub const DEFAULT_ZOOM_STEP: f64 = 0.1;

/// Grid the zoom factor is rounded to. Also the smallest usable step.
pub const ZOOM_RESOLUTION: f64 = 0.001;

/// Bounds and step size for zoom mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub max: f64,
    pub step: f64,
}

impl ZoomLimits {
    /// Build limits, rejecting a maximum below 1.0 or a step finer than
    /// [`ZOOM_RESOLUTION`].
    pub fn new(max: f64, step: f64) -> Result<Self, String> {
        if !max.is_finite() || max < MIN_ZOOM {
            return Err(format!("Maximum zoom must be at least {}, got {}", MIN_ZOOM, max));
        }
        if !step.is_finite() || step < ZOOM_RESOLUTION {
            return Err(format!(
                "Zoom step must be at least {}, got {}",
                ZOOM_RESOLUTION, step
            ));
        }
        Ok(Self { max, step })
    }

    /// Clamp a candidate value into `[MIN_ZOOM, max]`.
    pub fn clamp(&self, value: f64) -> f64 {
        quantize(value).clamp(MIN_ZOOM, self.max)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            max: DEFAULT_MAX_ZOOM,
            step: DEFAULT_ZOOM_STEP,
        }
    }
}

// Keeps repeated steps on the ZOOM_RESOLUTION grid so 1.0 + 3 * 0.1 reads back as 1.3.
fn quantize(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Atomic zoom factor, always within its [`ZoomLimits`].
///
/// The value is stored as the bit pattern of an `f64` inside an `AtomicU64`,
/// so reads can never observe a torn write.
#[derive(Debug)]
pub struct ZoomState {
    bits: AtomicU64,
    limits: ZoomLimits,
}

impl ZoomState {
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            bits: AtomicU64::new(MIN_ZOOM.to_bits()),
            limits,
        }
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Current zoom factor.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Increase by one step, saturating at the maximum. Returns the new value.
    pub fn zoom_in(&self) -> f64 {
        let step = self.limits.step;
        self.update(|z| z + step)
    }

    /// Decrease by one step, saturating at 1.0. Returns the new value.
    pub fn zoom_out(&self) -> f64 {
        let step = self.limits.step;
        self.update(|z| z - step)
    }

    /// Return to exactly 1.0.
    pub fn reset(&self) -> f64 {
        self.bits.store(MIN_ZOOM.to_bits(), Ordering::Release);
        MIN_ZOOM
    }

    fn update(&self, f: impl Fn(f64) -> f64) -> f64 {
        let limits = self.limits;
        let previous = match self.bits.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            Some(limits.clamp(f(f64::from_bits(bits))).to_bits())
        }) {
            Ok(bits) | Err(bits) => bits,
        };
        limits.clamp(f(f64::from_bits(previous)))
    }
}

/// What applying a [`ControlCommand`] did to the worker state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    /// Zoom changed (or saturated) to this value
    Zoom(f64),
    /// Quit was requested
    Quit,
    /// The command has no meaning inside a worker
    Ignored,
}

/// Per-worker state shared between the render loop and the input listener.
#[derive(Debug)]
pub struct WorkerState {
    pub zoom: ZoomState,
    quit: AtomicBool,
}

impl WorkerState {
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            zoom: ZoomState::new(limits),
            quit: AtomicBool::new(false),
        }
    }

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    /// Apply a command directly. Safe to call from any thread.
    pub fn apply(&self, command: ControlCommand) -> Applied {
        match command {
            ControlCommand::ZoomIn => {
                let z = self.zoom.zoom_in();
                log::info!("Zoom in: {:.1}", z);
                Applied::Zoom(z)
            }
            ControlCommand::ZoomOut => {
                let z = self.zoom.zoom_out();
                log::info!("Zoom out: {:.1}", z);
                Applied::Zoom(z)
            }
            ControlCommand::ResetZoom => {
                log::info!("Reset zoom");
                Applied::Zoom(self.zoom.reset())
            }
            ControlCommand::Quit => {
                log::info!("Magnifier quit requested");
                self.request_quit();
                Applied::Quit
            }
            ControlCommand::LaunchProfile(_) => Applied::Ignored,
        }
    }
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}
