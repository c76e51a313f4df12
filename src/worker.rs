//! The magnifier worker process.
//!
//! Opens the camera and the presentation surface for one profile, starts the
//! physical input listener when configured, and runs the render loop until
//! quit. The camera is always released before the surface is torn down.

use std::path::PathBuf;
use std::sync::Arc;

use crate::camera::{open_source, CameraError, CameraSettings, FrameSource, Resolution, SourceKind};
use crate::command::KeyMap;
use crate::config::Config;
use crate::engine::{EngineError, EngineOptions, ExitReason, Magnifier};
use crate::error::ErrorClass;
use crate::input::{
    open_physical, spawn_listener, InputError, InputMode, KeySource, ListenerFlow, PhysicalBackend,
};
use crate::present::{open_sink, PresentError, PresentationSink, SinkKind, SurfaceOptions};
use crate::zoom::{Applied, WorkerState, ZoomLimits};

/// Errors that end the worker with a non-zero exit status.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Present(#[from] PresentError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl WorkerError {
    pub fn error_class(&self) -> ErrorClass {
        match self {
            WorkerError::Camera(e) => e.error_class(),
            WorkerError::Present(e) => e.error_class(),
            WorkerError::Engine(e) => e.error_class(),
        }
    }
}

/// Everything the worker needs, resolved from config and command line.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub resolution: Resolution,
    pub limits: ZoomLimits,
    pub input_mode: InputMode,
    pub backend: PhysicalBackend,
    pub device: PathBuf,
    pub source: SourceKind,
    pub sink: SinkKind,
    pub camera: CameraSettings,
    pub surface: SurfaceOptions,
    pub engine: EngineOptions,
}

impl WorkerOptions {
    pub fn from_config(config: &Config, resolution: Resolution) -> Self {
        Self {
            resolution,
            limits: config.zoom_limits(),
            input_mode: config.input_mode(),
            backend: config.input.backend,
            device: config.input.device.clone(),
            source: config.worker.source,
            sink: SinkKind::Window,
            camera: config.camera_settings(resolution),
            surface: SurfaceOptions {
                title: config.display.title.clone(),
                resolution,
                fullscreen: config.fullscreen(),
            },
            engine: EngineOptions {
                overlay: config.display.overlay,
                ..EngineOptions::default()
            },
        }
    }
}

pub struct Worker {
    options: WorkerOptions,
    state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(options: WorkerOptions) -> Self {
        let state = Arc::new(WorkerState::new(options.limits));
        Self { options, state }
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    pub fn state(&self) -> &Arc<WorkerState> {
        &self.state
    }

    /// Make SIGINT/SIGTERM request a clean stop. Can only be done once per
    /// process.
    pub fn install_signal_handler(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || {
            log::info!("Termination signal received");
            state.request_quit();
        })
    }

    /// Open the configured camera, surface and keypad, then run.
    pub fn run(&self) -> Result<ExitReason, WorkerError> {
        let source = open_source(self.options.source, &self.options.camera)?;
        log::info!(
            "Opened {} (requested {})",
            source.describe(),
            self.options.resolution
        );
        let sink = open_sink(self.options.sink, &self.options.surface)?;

        let backend = self.options.backend;
        let device = self.options.device.clone();
        self.run_with(source, sink, move || open_physical(backend, &device))
    }

    /// Run with an already opened source and sink. `open_input` is only
    /// called in physical mode, on the listener thread.
    pub fn run_with<S, P, O>(&self, source: S, sink: P, open_input: O) -> Result<ExitReason, WorkerError>
    where
        S: FrameSource,
        P: PresentationSink,
        O: FnOnce() -> Result<Box<dyn KeySource>, InputError> + Send + 'static,
    {
        let surface_keys = match self.options.input_mode {
            InputMode::Local => KeyMap::magnifier(),
            InputMode::Physical => {
                self.start_listener(open_input);
                KeyMap::surface_quit()
            }
        };

        let mut magnifier = Magnifier::new(
            source,
            sink,
            Arc::clone(&self.state),
            surface_keys,
            self.options.engine,
        );
        let result = magnifier.run();
        magnifier.shutdown();

        let reason = result?;
        log::info!("Magnifier stopped: {:?} at zoom {:.1}", reason, self.state.zoom.get());
        Ok(reason)
    }

    fn start_listener<O>(&self, open_input: O)
    where
        O: FnOnce() -> Result<Box<dyn KeySource>, InputError> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let spawned = spawn_listener(open_input, KeyMap::magnifier(), move |command| {
            match state.apply(command) {
                Applied::Quit => ListenerFlow::Stop,
                Applied::Zoom(_) | Applied::Ignored => ListenerFlow::Continue,
            }
        });
        if let Err(e) = spawned {
            log::error!("Failed to start input listener: {}", e);
            log::warn!("Continuing without physical input; zoom control is frozen");
        }
    }
}
