//! Control vocabulary shared by every input source.
//!
//! Keyboards, the window surface and the physical keypad all normalize their
//! raw key codes into [`InputKey`]; a [`KeyMap`] then turns key-down events
//! into [`ControlCommand`]s. Because the mapping table is the same whatever
//! the source, the same logical key always yields the same command.

use std::collections::HashMap;
use std::fmt;

/// A command understood by the worker or the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    ZoomIn,
    ZoomOut,
    ResetZoom,
    /// Launch the profile at this index in the configured profile list
    LaunchProfile(usize),
    Quit,
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::ZoomIn => write!(f, "zoom in"),
            ControlCommand::ZoomOut => write!(f, "zoom out"),
            ControlCommand::ResetZoom => write!(f, "reset zoom"),
            ControlCommand::LaunchProfile(i) => write!(f, "launch profile {}", i + 1),
            ControlCommand::Quit => write!(f, "quit"),
        }
    }
}

/// Logical key, independent of the driver that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKey {
    /// Letter key, always lowercase
    Char(char),
    /// Top-row digit 0-9
    Digit(u8),
    /// Numeric keypad digit 0-9
    KeypadDigit(u8),
    KeypadPlus,
    KeypadMinus,
    KeypadEnter,
    Equal,
    Minus,
    Escape,
    Enter,
    Up,
    Down,
    /// Anything else, keeping the raw driver code for logging
    Other(u32),
}

impl InputKey {
    /// Normalize a typed character. Letters are lowercased.
    pub fn from_char(c: char) -> Self {
        match c {
            '0'..='9' => InputKey::Digit(c as u8 - b'0'),
            '+' | '=' => InputKey::Equal,
            '-' => InputKey::Minus,
            c if c.is_ascii_alphabetic() => InputKey::Char(c.to_ascii_lowercase()),
            c => InputKey::Other(c as u32),
        }
    }
}

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransition {
    Down,
    Up,
    /// Auto-repeat while held
    Repeat,
}

/// A single key transition from an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: InputKey,
    pub transition: KeyTransition,
}

impl KeyEvent {
    pub fn down(key: InputKey) -> Self {
        Self {
            key,
            transition: KeyTransition::Down,
        }
    }

    pub fn up(key: InputKey) -> Self {
        Self {
            key,
            transition: KeyTransition::Up,
        }
    }
}

/// Fixed mapping from logical keys to commands.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<InputKey, ControlCommand>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, replacing any previous binding of the same key.
    pub fn bind(mut self, key: InputKey, command: ControlCommand) -> Self {
        self.bindings.insert(key, command);
        self
    }

    /// Bindings used by the magnifier worker.
    ///
    /// - `KP+`, `=`, Up: zoom in
    /// - `KP-`, `-`, Down: zoom out
    /// - `KP0`, `0`: reset
    /// - Esc, `KP Enter`, `q`: quit
    pub fn magnifier() -> Self {
        Self::new()
            .bind(InputKey::KeypadPlus, ControlCommand::ZoomIn)
            .bind(InputKey::Equal, ControlCommand::ZoomIn)
            .bind(InputKey::Up, ControlCommand::ZoomIn)
            .bind(InputKey::KeypadMinus, ControlCommand::ZoomOut)
            .bind(InputKey::Minus, ControlCommand::ZoomOut)
            .bind(InputKey::Down, ControlCommand::ZoomOut)
            .bind(InputKey::KeypadDigit(0), ControlCommand::ResetZoom)
            .bind(InputKey::Digit(0), ControlCommand::ResetZoom)
            .bind(InputKey::Escape, ControlCommand::Quit)
            .bind(InputKey::KeypadEnter, ControlCommand::Quit)
            .bind(InputKey::Char('q'), ControlCommand::Quit)
    }

    /// Only the surface quit key. Used on the render surface when zoom
    /// commands come from the physical keypad instead.
    pub fn surface_quit() -> Self {
        Self::new().bind(InputKey::Char('q'), ControlCommand::Quit)
    }

    /// Bindings used by the launcher: each profile's letter, keypad and
    /// top-row digits `1..9` for the n-th profile, `q`/Esc to quit.
    pub fn launcher(profile_keys: &[Option<char>]) -> Self {
        let mut map = Self::new()
            .bind(InputKey::Char('q'), ControlCommand::Quit)
            .bind(InputKey::Escape, ControlCommand::Quit);
        for (i, key) in profile_keys.iter().enumerate() {
            if i < 9 {
                let digit = (i + 1) as u8;
                map = map
                    .bind(InputKey::KeypadDigit(digit), ControlCommand::LaunchProfile(i))
                    .bind(InputKey::Digit(digit), ControlCommand::LaunchProfile(i));
            }
            if let Some(c) = key {
                map = map.bind(InputKey::from_char(*c), ControlCommand::LaunchProfile(i));
            }
        }
        map
    }

    pub fn lookup(&self, key: InputKey) -> Option<ControlCommand> {
        self.bindings.get(&key).copied()
    }

    /// Translate an event. Only key-down transitions produce commands.
    pub fn translate(&self, event: &KeyEvent) -> Option<ControlCommand> {
        match event.transition {
            KeyTransition::Down => self.lookup(event.key),
            KeyTransition::Up | KeyTransition::Repeat => None,
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
