//! Operator-facing status output for the launcher.

use std::io::{IsTerminal, Write};

use crate::config::ProfileConfig;

/// Where the launcher reports what it is doing.
pub trait StatusDisplay {
    /// Show the launchable profiles and their keys.
    fn show_profiles(&mut self, profiles: &[ProfileConfig]);

    /// Replace the device status line.
    fn show_device_status(&mut self, text: &str, is_error: bool);

    /// Replace the worker status line.
    fn show_worker(&mut self, text: &str);
}

/// Plain terminal output. Error lines are red when writing to a terminal.
pub struct TerminalStatus<W: Write> {
    out: W,
    color: bool,
}

impl TerminalStatus<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::detect(std::io::stdout())
    }
}

impl<W: Write + IsTerminal> TerminalStatus<W> {
    /// Color only if `out` is a terminal, so piped output stays plain.
    pub fn detect(out: W) -> Self {
        let color = out.is_terminal();
        Self::new(out, color)
    }
}

impl<W: Write> TerminalStatus<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        // Status output is best effort; a closed stdout must not stop the launcher.
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}

impl<W: Write> StatusDisplay for TerminalStatus<W> {
    fn show_profiles(&mut self, profiles: &[ProfileConfig]) {
        self.line("Select a profile:");
        for (i, profile) in profiles.iter().enumerate() {
            let key = profile
                .key
                .map(|c| format!("{} / ", c))
                .unwrap_or_default();
            self.line(&format!(
                "  [{}{}] {} ({})",
                key,
                i + 1,
                profile.name,
                profile.resolution
            ));
        }
        self.line("  [q] Quit");
    }

    fn show_device_status(&mut self, text: &str, is_error: bool) {
        if is_error && self.color {
            self.line(&format!("\x1b[31m{}\x1b[0m", text));
        } else {
            self.line(text);
        }
    }

    fn show_worker(&mut self, text: &str) {
        self.line(text);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every status update.
    #[derive(Debug, Default)]
    pub struct RecordingStatus {
        pub profiles: usize,
        pub device: Vec<(String, bool)>,
        pub worker: Vec<String>,
    }

    impl StatusDisplay for RecordingStatus {
        fn show_profiles(&mut self, profiles: &[ProfileConfig]) {
            self.profiles = profiles.len();
        }

        fn show_device_status(&mut self, text: &str, is_error: bool) {
            self.device.push((text.to_string(), is_error));
        }

        fn show_worker(&mut self, text: &str) {
            self.worker.push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_terminal_profile_menu() {
        let mut status = TerminalStatus::new(Vec::new(), false);
        status.show_profiles(&Config::default().profiles);
        status.show_device_status("Control device not found. Please check battery.", true);
        let text = String::from_utf8(status.into_inner()).unwrap();
        assert!(text.contains("[h / 1] High Resolution (Reading) (1280x720)"));
        assert!(text.contains("[l / 2] Low Resolution (Embroidery) (800x450)"));
        assert!(text.contains("[q] Quit"));
        assert!(text.contains("check battery"));
        assert!(!text.contains("\x1b[31m"));
    }

    #[test]
    fn test_terminal_colors_errors() {
        let mut status = TerminalStatus::new(Vec::new(), true);
        status.show_device_status("Error checking device status.", true);
        status.show_device_status("Control device connected", false);
        let text = String::from_utf8(status.into_inner()).unwrap();
        assert!(text.starts_with("\x1b[31mError checking device status."));
        assert!(text.ends_with("Control device connected\n"));
    }

    #[test]
    fn test_redirected_output_is_plain() {
        use std::io::{Read, Seek, SeekFrom};

        let mut status = TerminalStatus::detect(tempfile::tempfile().unwrap());
        status.show_device_status("Error checking device status.", true);
        let mut file = status.into_inner();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        assert_eq!(text, "Error checking device status.\n");
    }
}
