//! Input routing for the worker and the launcher.
//!
//! Two input modes exist:
//! - [`InputMode::Local`]: keys pressed on the presentation surface (worker)
//!   or typed on the terminal (launcher) are handled on the owning thread.
//! - [`InputMode::Physical`]: a dedicated listener thread blocks on the
//!   keypad and dispatches commands as they arrive.
//!
//! Every source yields [`KeyEvent`]s and goes through the same [`KeyMap`].

#[cfg(target_os = "linux")]
mod evdev;
#[cfg(feature = "hotkeys")]
mod global;
mod lines;

use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crate::command::{ControlCommand, KeyEvent, KeyMap};
use crate::error::ErrorClass;

#[cfg(target_os = "linux")]
pub use evdev::EventDevice;
#[cfg(feature = "hotkeys")]
pub use global::GlobalKeys;
pub use lines::LineKeys;

/// Where commands come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    #[default]
    Local,
    Physical,
}

/// How the physical keypad is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhysicalBackend {
    /// Read key events from an input device node such as `/dev/input/event0`
    #[default]
    EventDevice,
    /// Listen to every keyboard globally (requires the `hotkeys` feature)
    Global,
}

/// Errors from input sources.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Error opening device {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error reading input: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("Global key listener failed: {0}")]
    ListenerFailed(String),

    #[error("{0} input is not available in this build")]
    Unsupported(&'static str),
}

impl InputError {
    pub fn error_class(&self) -> ErrorClass {
        ErrorClass::DegradedInput
    }
}

/// A blocking stream of key transitions.
pub trait KeySource: Send {
    fn describe(&self) -> String;

    /// Block until the next event. `Ok(None)` means the source has ended.
    fn next_event(&mut self) -> Result<Option<KeyEvent>, InputError>;
}

/// What the listener does after dispatching a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerFlow {
    Continue,
    Stop,
}

/// Open the physical keypad with the configured backend.
pub fn open_physical(
    backend: PhysicalBackend,
    device: &std::path::Path,
) -> Result<Box<dyn KeySource>, InputError> {
    match backend {
        PhysicalBackend::EventDevice => open_event_device(device),
        PhysicalBackend::Global => open_global(),
    }
}

#[cfg(target_os = "linux")]
fn open_event_device(device: &std::path::Path) -> Result<Box<dyn KeySource>, InputError> {
    Ok(Box::new(EventDevice::open(device)?))
}

#[cfg(not(target_os = "linux"))]
fn open_event_device(_device: &std::path::Path) -> Result<Box<dyn KeySource>, InputError> {
    Err(InputError::Unsupported("Input device"))
}

#[cfg(feature = "hotkeys")]
fn open_global() -> Result<Box<dyn KeySource>, InputError> {
    Ok(Box::new(GlobalKeys::start()))
}

#[cfg(not(feature = "hotkeys"))]
fn open_global() -> Result<Box<dyn KeySource>, InputError> {
    Err(InputError::Unsupported("Global hotkey"))
}

/// Read events until the source ends, a read fails, or `dispatch` asks to
/// stop. Key-up and repeat transitions are ignored.
///
/// Returns the number of commands dispatched.
pub fn run_listener<F>(source: &mut dyn KeySource, keymap: &KeyMap, mut dispatch: F) -> usize
where
    F: FnMut(ControlCommand) -> ListenerFlow,
{
    let mut dispatched = 0;
    loop {
        match source.next_event() {
            Ok(Some(event)) => {
                let Some(command) = keymap.translate(&event) else {
                    continue;
                };
                log::debug!("{} -> {}", source.describe(), command);
                dispatched += 1;
                if dispatch(command) == ListenerFlow::Stop {
                    break;
                }
            }
            Ok(None) => {
                log::info!("Input from {} ended", source.describe());
                break;
            }
            Err(e) => {
                log::error!("{}", e);
                break;
            }
        }
    }
    dispatched
}

/// Spawn the listener thread.
///
/// The source is opened on the new thread. If opening fails the error is
/// logged and the thread exits; the caller keeps running without input
/// from this source. The thread is not joined: it may stay blocked on the
/// device until the process exits.
pub fn spawn_listener<O, F>(open: O, keymap: KeyMap, dispatch: F) -> std::io::Result<JoinHandle<()>>
where
    O: FnOnce() -> Result<Box<dyn KeySource>, InputError> + Send + 'static,
    F: FnMut(ControlCommand) -> ListenerFlow + Send + 'static,
{
    thread::Builder::new()
        .name("input-listener".to_string())
        .spawn(move || {
            let mut source = match open() {
                Ok(source) => source,
                Err(e) => {
                    log::error!("{}", e);
                    log::warn!("Continuing without physical input; zoom control is frozen");
                    return;
                }
            };
            log::info!("Listening on {}", source.describe());
            run_listener(source.as_mut(), &keymap, dispatch);
        })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed list of events, then ends.
    pub struct ScriptedKeys {
        events: VecDeque<Result<KeyEvent, String>>,
    }

    impl ScriptedKeys {
        pub fn new(events: impl IntoIterator<Item = KeyEvent>) -> Self {
            Self {
                events: events.into_iter().map(Ok).collect(),
            }
        }

        pub fn then_fail(mut self, message: &str) -> Self {
            self.events.push_back(Err(message.to_string()));
            self
        }
    }

    impl KeySource for ScriptedKeys {
        fn describe(&self) -> String {
            "scripted keys".to_string()
        }

        fn next_event(&mut self) -> Result<Option<KeyEvent>, InputError> {
            match self.events.pop_front() {
                Some(Ok(event)) => Ok(Some(event)),
                Some(Err(message)) => Err(InputError::ListenerFailed(message)),
                None => Ok(None),
            }
        }
    }
}
