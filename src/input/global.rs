//! Global keyboard capture through rdev.
//!
//! rdev's `listen` blocks forever on its own thread, so events are forwarded
//! over a channel and read back by [`GlobalKeys::next_event`]. On macOS the
//! listener needs Accessibility permission; on Linux it needs an X session.

use std::sync::mpsc::{self, Receiver};
use std::thread;

use rdev::{listen, Event, EventType, Key};

use super::{InputError, KeySource};
use crate::command::{InputKey, KeyEvent};

pub struct GlobalKeys {
    events: Receiver<Result<KeyEvent, String>>,
}

impl GlobalKeys {
    /// Start the listener thread.
    pub fn start() -> Self {
        let (tx, rx) = mpsc::channel();
        let errors = tx.clone();

        thread::spawn(move || {
            let callback = move |event: Event| {
                let event = match event.event_type {
                    EventType::KeyPress(key) => KeyEvent::down(map_key(key)),
                    EventType::KeyRelease(key) => KeyEvent::up(map_key(key)),
                    _ => return,
                };
                // Receiver gone means the listener was dropped; nothing to do.
                let _ = tx.send(Ok(event));
            };

            if let Err(e) = listen(callback) {
                let _ = errors.send(Err(format!("{:?}", e)));
            }
        });

        Self { events: rx }
    }
}

impl KeySource for GlobalKeys {
    fn describe(&self) -> String {
        "global keyboard".to_string()
    }

    fn next_event(&mut self) -> Result<Option<KeyEvent>, InputError> {
        match self.events.recv() {
            Ok(Ok(event)) => Ok(Some(event)),
            Ok(Err(message)) => Err(InputError::ListenerFailed(message)),
            Err(_) => Ok(None),
        }
    }
}

fn map_key(key: Key) -> InputKey {
    match key {
        Key::KeyA => InputKey::Char('a'),
        Key::KeyB => InputKey::Char('b'),
        Key::KeyC => InputKey::Char('c'),
        Key::KeyD => InputKey::Char('d'),
        Key::KeyE => InputKey::Char('e'),
        Key::KeyF => InputKey::Char('f'),
        Key::KeyG => InputKey::Char('g'),
        Key::KeyH => InputKey::Char('h'),
        Key::KeyI => InputKey::Char('i'),
        Key::KeyJ => InputKey::Char('j'),
        Key::KeyK => InputKey::Char('k'),
        Key::KeyL => InputKey::Char('l'),
        Key::KeyM => InputKey::Char('m'),
        Key::KeyN => InputKey::Char('n'),
        Key::KeyO => InputKey::Char('o'),
        Key::KeyP => InputKey::Char('p'),
        Key::KeyQ => InputKey::Char('q'),
        Key::KeyR => InputKey::Char('r'),
        Key::KeyS => InputKey::Char('s'),
        Key::KeyT => InputKey::Char('t'),
        Key::KeyU => InputKey::Char('u'),
        Key::KeyV => InputKey::Char('v'),
        Key::KeyW => InputKey::Char('w'),
        Key::KeyX => InputKey::Char('x'),
        Key::KeyY => InputKey::Char('y'),
        Key::KeyZ => InputKey::Char('z'),
        Key::Num0 => InputKey::Digit(0),
        Key::Num1 => InputKey::Digit(1),
        Key::Num2 => InputKey::Digit(2),
        Key::Num3 => InputKey::Digit(3),
        Key::Num4 => InputKey::Digit(4),
        Key::Num5 => InputKey::Digit(5),
        Key::Num6 => InputKey::Digit(6),
        Key::Num7 => InputKey::Digit(7),
        Key::Num8 => InputKey::Digit(8),
        Key::Num9 => InputKey::Digit(9),
        Key::Kp0 => InputKey::KeypadDigit(0),
        Key::Kp1 => InputKey::KeypadDigit(1),
        Key::Kp2 => InputKey::KeypadDigit(2),
        Key::Kp3 => InputKey::KeypadDigit(3),
        Key::Kp4 => InputKey::KeypadDigit(4),
        Key::Kp5 => InputKey::KeypadDigit(5),
        Key::Kp6 => InputKey::KeypadDigit(6),
        Key::Kp7 => InputKey::KeypadDigit(7),
        Key::Kp8 => InputKey::KeypadDigit(8),
        Key::Kp9 => InputKey::KeypadDigit(9),
        Key::KpPlus => InputKey::KeypadPlus,
        Key::KpMinus => InputKey::KeypadMinus,
        Key::KpReturn => InputKey::KeypadEnter,
        Key::Equal => InputKey::Equal,
        Key::Minus => InputKey::Minus,
        Key::Escape => InputKey::Escape,
        Key::Return => InputKey::Enter,
        Key::UpArrow => InputKey::Up,
        Key::DownArrow => InputKey::Down,
        Key::Unknown(code) => InputKey::Other(code),
        _ => InputKey::Other(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_key() {
        assert_eq!(map_key(Key::KpPlus), InputKey::KeypadPlus);
        assert_eq!(map_key(Key::Kp0), InputKey::KeypadDigit(0));
        assert_eq!(map_key(Key::KeyH), InputKey::Char('h'));
        assert_eq!(map_key(Key::Num1), InputKey::Digit(1));
        assert_eq!(map_key(Key::Escape), InputKey::Escape);
        assert_eq!(map_key(Key::Unknown(999)), InputKey::Other(999));
    }
}
