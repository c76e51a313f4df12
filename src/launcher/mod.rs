//! The profile launcher.
//!
//! A single-threaded tokio loop owns the [`Supervisor`] and the status
//! display. Everything else reports back to it through one event channel:
//! the key listener thread, the connectivity poll task and the Ctrl+C
//! handler. The loop never waits on the connectivity query; polls run as
//! separate tasks with their own timeout.

mod status;

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::command::{ControlCommand, KeyMap};
use crate::config::{Config, Deployment, ProfileConfig};
use crate::error::ErrorClass;
use crate::input::{
    open_physical, spawn_listener, InputMode, KeySource, LineKeys, ListenerFlow, PhysicalBackend,
};
use crate::monitor::{ConnectivityQuery, DeviceStatus, MONITORING_DISABLED};
use crate::supervisor::{DisplayConfigurator, Supervisor, WorkerCommand};

pub use status::{StatusDisplay, TerminalStatus};

/// How often the worker's liveness is checked.
pub const REAP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("Failed to start event loop: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Cannot locate worker executable: {0}")]
    WorkerExecutable(#[source] std::io::Error),
}

impl LauncherError {
    pub fn error_class(&self) -> ErrorClass {
        ErrorClass::FatalResource
    }
}

/// Everything that can wake the launcher loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherEvent {
    Command(ControlCommand),
    Status(DeviceStatus),
    /// Ctrl+C or a window-manager close
    CloseRequested,
}

#[derive(Debug, Clone)]
pub struct LauncherOptions {
    pub profiles: Vec<ProfileConfig>,
    /// `None` disables connectivity monitoring
    pub monitor: Option<ConnectivityQuery>,
    pub poll_interval: Duration,
    pub intercept_window_close: bool,
    pub reap_interval: Duration,
}

impl LauncherOptions {
    pub fn from_config(config: &Config) -> Self {
        let monitor = config.monitoring_enabled().then(|| {
            ConnectivityQuery::bluetoothctl(&config.keypad.address, config.query_timeout())
        });
        Self {
            profiles: config.profiles.clone(),
            monitor,
            poll_interval: config.poll_interval(),
            intercept_window_close: config.display.intercept_window_close,
            reap_interval: REAP_INTERVAL,
        }
    }
}

pub struct Launcher<D: StatusDisplay> {
    options: LauncherOptions,
    supervisor: Supervisor,
    display: D,
    events_tx: UnboundedSender<LauncherEvent>,
    events_rx: UnboundedReceiver<LauncherEvent>,
    poll_in_flight: bool,
}

impl<D: StatusDisplay> Launcher<D> {
    pub fn new(options: LauncherOptions, supervisor: Supervisor, display: D) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            options,
            supervisor,
            display,
            events_tx,
            events_rx,
            poll_in_flight: false,
        }
    }

    /// Sender for events produced outside the loop.
    pub fn sender(&self) -> UnboundedSender<LauncherEvent> {
        self.events_tx.clone()
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run until quit. The current worker is stopped before returning.
    pub async fn run(&mut self) {
        self.display.show_profiles(&self.options.profiles);
        if self.options.monitor.is_none() {
            self.display.show_device_status(MONITORING_DISABLED, false);
        }

        let mut poll = tokio::time::interval(self.options.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut reap = tokio::time::interval(self.options.reap_interval);
        reap.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let monitoring = self.options.monitor.is_some();

        loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => {
                    if self.handle_event(event) == ListenerFlow::Stop {
                        break;
                    }
                }
                _ = poll.tick(), if monitoring => self.start_poll(),
                _ = reap.tick() => self.reap_worker(),
            }
        }

        log::info!("Launcher quitting");
        self.supervisor.shutdown();
        self.display.show_worker("Stopped");
    }

    fn handle_event(&mut self, event: LauncherEvent) -> ListenerFlow {
        match event {
            LauncherEvent::Command(command) => self.handle_command(command),
            LauncherEvent::Status(status) => {
                self.poll_in_flight = false;
                log::debug!("Device status: {:?}", status);
                self.display
                    .show_device_status(status.message(), status.is_error());
                ListenerFlow::Continue
            }
            LauncherEvent::CloseRequested if self.options.intercept_window_close => {
                log::info!("Close requested");
                ListenerFlow::Stop
            }
            LauncherEvent::CloseRequested => {
                log::info!("Close request ignored; press q to quit");
                ListenerFlow::Continue
            }
        }
    }

    fn handle_command(&mut self, command: ControlCommand) -> ListenerFlow {
        match command {
            ControlCommand::LaunchProfile(index) => {
                self.launch(index);
                ListenerFlow::Continue
            }
            ControlCommand::Quit => ListenerFlow::Stop,
            ControlCommand::ZoomIn | ControlCommand::ZoomOut | ControlCommand::ResetZoom => {
                log::debug!("Ignoring {} in launcher", command);
                ListenerFlow::Continue
            }
        }
    }

    fn launch(&mut self, index: usize) {
        let Some(profile) = self.options.profiles.get(index) else {
            log::warn!("No profile {}", index + 1);
            return;
        };
        let (name, resolution) = (profile.name.clone(), profile.resolution);

        match self.supervisor.launch(resolution) {
            Ok(launched) => {
                if let Some(outcome) = launched.replaced {
                    log::info!("Previous worker: {:?}", outcome);
                }
                self.display
                    .show_worker(&format!("Running {} ({})", name, resolution));
            }
            Err(e) => {
                log::error!("{}", e);
                self.display.show_worker(&format!("Failed to start {}: {}", name, e));
            }
        }
    }

    fn start_poll(&mut self) {
        let Some(query) = self.options.monitor.clone() else {
            return;
        };
        if self.poll_in_flight {
            log::debug!("Previous connectivity check still running");
            return;
        }
        self.poll_in_flight = true;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let status = query.poll_once().await;
            let _ = tx.send(LauncherEvent::Status(status));
        });
    }

    fn reap_worker(&mut self) {
        if let Some(status) = self.supervisor.reap() {
            self.display.show_worker(&format!("Magnifier exited ({})", status));
        }
    }
}

/// Feed launcher key presses from the configured input into the event
/// channel. The listener thread stops once the launcher is gone.
pub fn spawn_key_listener(config: &Config, tx: UnboundedSender<LauncherEvent>) -> std::io::Result<()> {
    let keymap = KeyMap::launcher(&config.profile_keys());
    let dispatch = move |command| match tx.send(LauncherEvent::Command(command)) {
        Ok(()) => ListenerFlow::Continue,
        Err(_) => ListenerFlow::Stop,
    };

    match config.input_mode() {
        InputMode::Local => {
            spawn_listener(
                || Ok(Box::new(LineKeys::stdin()) as Box<dyn KeySource>),
                keymap,
                dispatch,
            )?;
        }
        InputMode::Physical => {
            let backend = config.input.backend;
            let device = config.input.device.clone();
            spawn_listener(move || open_physical(backend, &device), keymap, dispatch)?;
        }
    }
    Ok(())
}

/// Append the launcher's resolved settings as worker flags.
///
/// The worker reloads the config file, so command-line overrides given to
/// the launcher (deployment, input mode, verbosity) must travel on the
/// worker's own command line.
pub fn forward_settings(command: WorkerCommand, config: &Config, verbose: bool) -> WorkerCommand {
    let deployment = match config.deployment() {
        Deployment::Development => "development",
        Deployment::Production => "production",
    };
    let input = match config.input_mode() {
        InputMode::Local => "local",
        InputMode::Physical => "physical",
    };
    let backend = match config.input.backend {
        PhysicalBackend::EventDevice => "event-device",
        PhysicalBackend::Global => "global",
    };

    let command = command
        .arg("--deployment")
        .arg(deployment)
        .arg("--input")
        .arg(input)
        .arg("--backend")
        .arg(backend)
        .arg("--device")
        .arg(config.input.device.clone());
    if verbose {
        command.arg("--verbose")
    } else {
        command
    }
}

/// Run the launcher until quit.
pub fn run_launcher(
    config: &Config,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<(), LauncherError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(LauncherError::Runtime)?;

    let command = WorkerCommand::current_exe(config_path).map_err(LauncherError::WorkerExecutable)?;
    let command = forward_settings(command, config, verbose);
    let display = DisplayConfigurator::new(config.display.output.clone(), config.reconfigure_display());
    let supervisor = Supervisor::new(command, display, config.grace_period());

    let mut launcher = Launcher::new(
        LauncherOptions::from_config(config),
        supervisor,
        TerminalStatus::stdout(),
    );

    if let Err(e) = spawn_key_listener(config, launcher.sender()) {
        log::error!("Failed to start key listener: {}", e);
    }

    if config.display.intercept_window_close {
        let tx = launcher.sender();
        if let Err(e) = ctrlc::set_handler(move || {
            let _ = tx.send(LauncherEvent::CloseRequested);
        }) {
            log::warn!("Failed to set close handler: {}", e);
        }
    }

    log::info!("Launcher started ({:?})", config.deployment());
    runtime.block_on(launcher.run());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::status::testing::RecordingStatus;
    use super::*;
    use crate::camera::Resolution;
    use crate::supervisor::DEFAULT_GRACE_PERIOD;

    fn options(monitor: Option<ConnectivityQuery>, intercept: bool) -> LauncherOptions {
        LauncherOptions {
            profiles: Config::default().profiles,
            monitor,
            poll_interval: Duration::from_millis(50),
            intercept_window_close: intercept,
            reap_interval: Duration::from_millis(20),
        }
    }

    fn supervisor(program: &str, args: &[&str]) -> Supervisor {
        let mut command = WorkerCommand::new(program);
        for arg in args {
            command = command.arg(*arg);
        }
        Supervisor::new(
            command,
            DisplayConfigurator::new("HDMI-1", false),
            DEFAULT_GRACE_PERIOD,
        )
    }

    #[test]
    fn test_forwarded_worker_flags() {
        let mut config = Config::default();
        config.appliance.deployment = Deployment::Production;
        config.input.backend = PhysicalBackend::Global;

        let command = forward_settings(WorkerCommand::new("magnifier").arg("worker"), &config, true);
        assert_eq!(
            command.args_for(Resolution::HIGH),
            [
                "worker",
                "--deployment",
                "production",
                "--input",
                "physical",
                "--backend",
                "global",
                "--device",
                "/dev/input/event0",
                "--verbose",
                "--res",
                "1280x720",
            ]
        );
    }

    #[test]
    fn test_options_follow_monitoring_flag() {
        let dev = LauncherOptions::from_config(&Config::default());
        assert!(dev.monitor.is_none());
        assert_eq!(dev.profiles.len(), 2);
        assert!(dev.intercept_window_close);

        let mut config = Config::default();
        config.keypad.monitoring = Some(true);
        assert!(LauncherOptions::from_config(&config).monitor.is_some());
    }

    #[tokio::test]
    async fn test_quit_without_worker() {
        let mut launcher = Launcher::new(
            options(None, true),
            supervisor("/nonexistent/magnifier", &[]),
            RecordingStatus::default(),
        );
        launcher
            .sender()
            .send(LauncherEvent::Command(ControlCommand::Quit))
            .unwrap();
        launcher.run().await;
        let display = launcher.display();
        assert_eq!(display.profiles, 2);
        assert_eq!(display.device, [(MONITORING_DISABLED.to_string(), false)]);
        assert_eq!(display.worker.last().map(String::as_str), Some("Stopped"));
    }

    #[tokio::test]
    async fn test_close_request_respects_interception() {
        let mut launcher = Launcher::new(
            options(None, false),
            supervisor("/nonexistent/magnifier", &[]),
            RecordingStatus::default(),
        );
        let tx = launcher.sender();
        tx.send(LauncherEvent::CloseRequested).unwrap();
        tx.send(LauncherEvent::Status(DeviceStatus::NotFound)).unwrap();
        tx.send(LauncherEvent::Command(ControlCommand::Quit)).unwrap();
        launcher.run().await;
        // The status after the ignored close was still handled
        assert!(launcher
            .display()
            .device
            .iter()
            .any(|(text, error)| text.contains("check battery") && *error));
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let mut launcher = Launcher::new(
            options(None, true),
            supervisor("/nonexistent/magnifier", &[]),
            RecordingStatus::default(),
        );
        let tx = launcher.sender();
        tx.send(LauncherEvent::Command(ControlCommand::LaunchProfile(0))).unwrap();
        tx.send(LauncherEvent::Command(ControlCommand::LaunchProfile(7))).unwrap();
        tx.send(LauncherEvent::CloseRequested).unwrap();
        launcher.run().await;
        let worker = &launcher.display().worker;
        assert!(worker[0].starts_with("Failed to start High Resolution (Reading)"));
        assert_eq!(worker.len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_then_quit_stops_worker() {
        let mut launcher = Launcher::new(
            options(None, true),
            supervisor("sh", &["-c", "sleep 30", "sh"]),
            RecordingStatus::default(),
        );
        let tx = launcher.sender();
        tx.send(LauncherEvent::Command(ControlCommand::LaunchProfile(1))).unwrap();
        tx.send(LauncherEvent::Command(ControlCommand::Quit)).unwrap();
        launcher.run().await;
        assert!(launcher.supervisor().current().is_none());
        assert_eq!(
            launcher.display().worker[0],
            "Running Low Resolution (Embroidery) (800x450)"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_exit_is_observed() {
        let mut launcher = Launcher::new(
            options(None, true),
            supervisor("sh", &["-c", "exit 1", "sh"]),
            RecordingStatus::default(),
        );
        let tx = launcher.sender();
        tx.send(LauncherEvent::Command(ControlCommand::LaunchProfile(0))).unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = tx.send(LauncherEvent::Command(ControlCommand::Quit));
        });
        launcher.run().await;
        assert!(launcher
            .display()
            .worker
            .iter()
            .any(|line| line.starts_with("Magnifier exited")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_periodic_connectivity_poll() {
        let query = ConnectivityQuery::new(
            "echo",
            vec!["Connected: yes".to_string()],
            Duration::from_secs(2),
        );
        let mut launcher = Launcher::new(
            options(Some(query), true),
            supervisor("/nonexistent/magnifier", &[]),
            RecordingStatus::default(),
        );
        let tx = launcher.sender();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = tx.send(LauncherEvent::Command(ControlCommand::Quit));
        });
        launcher.run().await;
        let device = &launcher.display().device;
        assert!(!device.is_empty());
        assert!(device
            .iter()
            .all(|(text, error)| text == "Control device connected" && !error));
    }
}
