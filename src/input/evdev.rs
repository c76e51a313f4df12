//! Linux input device reader (`/dev/input/eventN`).
//!
//! The kernel delivers fixed-size `struct input_event` records: a `timeval`
//! followed by `type: u16`, `code: u16`, `value: i32` in native byte order.
//! Only `EV_KEY` records are turned into key events.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use super::{InputError, KeySource};
use crate::command::{InputKey, KeyEvent, KeyTransition};

const RECORD_SIZE: usize = std::mem::size_of::<libc::input_event>();
const EV_KEY: u16 = 0x01;

// Key codes from linux/input-event-codes.h
const KEY_ESC: u16 = 1;
const KEY_1: u16 = 2;
const KEY_0: u16 = 11;
const KEY_MINUS: u16 = 12;
const KEY_EQUAL: u16 = 13;
const KEY_ENTER: u16 = 28;
const KEY_KP7: u16 = 71;
const KEY_KP8: u16 = 72;
const KEY_KP9: u16 = 73;
const KEY_KPMINUS: u16 = 74;
const KEY_KP4: u16 = 75;
const KEY_KP5: u16 = 76;
const KEY_KP6: u16 = 77;
const KEY_KPPLUS: u16 = 78;
const KEY_KP1: u16 = 79;
const KEY_KP2: u16 = 80;
const KEY_KP3: u16 = 81;
const KEY_KP0: u16 = 82;
const KEY_KPENTER: u16 = 96;
const KEY_UP: u16 = 103;
const KEY_DOWN: u16 = 108;

// Letter rows of a US layout, by scan code.
const ROW_Q: (u16, &str) = (16, "qwertyuiop");
const ROW_A: (u16, &str) = (30, "asdfghjkl");
const ROW_Z: (u16, &str) = (44, "zxcvbnm");

/// Map a kernel key code to a logical key.
pub fn key_from_code(code: u16) -> InputKey {
    match code {
        KEY_ESC => InputKey::Escape,
        KEY_1..=KEY_0 => InputKey::Digit(((code - KEY_1 + 1) % 10) as u8),
        KEY_MINUS => InputKey::Minus,
        KEY_EQUAL => InputKey::Equal,
        KEY_ENTER => InputKey::Enter,
        KEY_KPMINUS => InputKey::KeypadMinus,
        KEY_KPPLUS => InputKey::KeypadPlus,
        KEY_KPENTER => InputKey::KeypadEnter,
        KEY_KP0 => InputKey::KeypadDigit(0),
        KEY_KP1 => InputKey::KeypadDigit(1),
        KEY_KP2 => InputKey::KeypadDigit(2),
        KEY_KP3 => InputKey::KeypadDigit(3),
        KEY_KP4 => InputKey::KeypadDigit(4),
        KEY_KP5 => InputKey::KeypadDigit(5),
        KEY_KP6 => InputKey::KeypadDigit(6),
        KEY_KP7 => InputKey::KeypadDigit(7),
        KEY_KP8 => InputKey::KeypadDigit(8),
        KEY_KP9 => InputKey::KeypadDigit(9),
        KEY_UP => InputKey::Up,
        KEY_DOWN => InputKey::Down,
        _ => letter(code).map_or(InputKey::Other(code as u32), InputKey::Char),
    }
}

fn letter(code: u16) -> Option<char> {
    [ROW_Q, ROW_A, ROW_Z].iter().find_map(|(start, letters)| {
        let offset = code.checked_sub(*start)? as usize;
        letters.chars().nth(offset)
    })
}

/// Decode one raw record. Returns `None` for non-key records.
pub fn decode_record(record: &[u8]) -> Option<KeyEvent> {
    if record.len() != RECORD_SIZE {
        return None;
    }
    let tail = &record[RECORD_SIZE - 8..];
    let kind = u16::from_ne_bytes([tail[0], tail[1]]);
    let code = u16::from_ne_bytes([tail[2], tail[3]]);
    let value = i32::from_ne_bytes([tail[4], tail[5], tail[6], tail[7]]);

    if kind != EV_KEY {
        return None;
    }
    let transition = match value {
        0 => KeyTransition::Up,
        1 => KeyTransition::Down,
        _ => KeyTransition::Repeat,
    };
    Some(KeyEvent {
        key: key_from_code(code),
        transition,
    })
}

/// Key events read from an input device node (or any reader of raw records).
pub struct EventDevice<R = File> {
    reader: R,
    path: PathBuf,
}

impl EventDevice<File> {
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let reader = File::open(path).map_err(|source| InputError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            reader,
            path: path.to_path_buf(),
        })
    }
}

impl<R: Read> EventDevice<R> {
    pub fn from_reader(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
        }
    }
}

impl<R: Read + Send> KeySource for EventDevice<R> {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn next_event(&mut self) -> Result<Option<KeyEvent>, InputError> {
        let mut record = [0u8; RECORD_SIZE];
        loop {
            match self.reader.read_exact(&mut record) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(InputError::ReadFailed(e)),
            }
            if let Some(event) = decode_record(&record) {
                return Ok(Some(event));
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn encode_record(kind: u16, code: u16, value: i32) -> Vec<u8> {
    let mut record = vec![0u8; RECORD_SIZE];
    let tail = RECORD_SIZE - 8;
    record[tail..tail + 2].copy_from_slice(&kind.to_ne_bytes());
    record[tail + 2..tail + 4].copy_from_slice(&code.to_ne_bytes());
    record[tail + 4..].copy_from_slice(&value.to_ne_bytes());
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EV_SYN: u16 = 0x00;
    const EV_MSC: u16 = 0x04;

    #[test]
    fn test_key_codes() {
        assert_eq!(key_from_code(KEY_KPPLUS), InputKey::KeypadPlus);
        assert_eq!(key_from_code(KEY_KPMINUS), InputKey::KeypadMinus);
        assert_eq!(key_from_code(KEY_KP0), InputKey::KeypadDigit(0));
        assert_eq!(key_from_code(KEY_0), InputKey::Digit(0));
        assert_eq!(key_from_code(KEY_1), InputKey::Digit(1));
        assert_eq!(key_from_code(KEY_KPENTER), InputKey::KeypadEnter);
        assert_eq!(key_from_code(16), InputKey::Char('q'));
        assert_eq!(key_from_code(35), InputKey::Char('h'));
        assert_eq!(key_from_code(38), InputKey::Char('l'));
        assert_eq!(key_from_code(500), InputKey::Other(500));
    }

    #[test]
    fn test_decode_skips_non_key_records() {
        assert_eq!(decode_record(&encode_record(EV_SYN, 0, 0)), None);
        assert_eq!(decode_record(&encode_record(EV_MSC, 4, 458840)), None);
        assert_eq!(
            decode_record(&encode_record(EV_KEY, KEY_KPPLUS, 1)),
            Some(KeyEvent::down(InputKey::KeypadPlus))
        );
        assert_eq!(
            decode_record(&encode_record(EV_KEY, KEY_KPPLUS, 0)),
            Some(KeyEvent::up(InputKey::KeypadPlus))
        );
        assert_eq!(decode_record(&[0u8; 3]), None);
    }

    #[test]
    fn test_reader_stream() {
        let mut bytes = Vec::new();
        bytes.extend(encode_record(EV_MSC, 4, 1));
        bytes.extend(encode_record(EV_KEY, KEY_KP0, 1));
        bytes.extend(encode_record(EV_SYN, 0, 0));
        bytes.extend(encode_record(EV_KEY, KEY_KP0, 2));
        let mut device = EventDevice::from_reader(Cursor::new(bytes), "/dev/input/test");

        assert_eq!(
            device.next_event().unwrap(),
            Some(KeyEvent::down(InputKey::KeypadDigit(0)))
        );
        let repeat = device.next_event().unwrap().unwrap();
        assert_eq!(repeat.transition, KeyTransition::Repeat);
        assert_eq!(device.next_event().unwrap(), None);
    }

    #[test]
    fn test_open_missing_device() {
        let err = EventDevice::open(Path::new("/dev/input/does-not-exist")).err().unwrap();
        assert!(matches!(err, InputError::OpenFailed { .. }));
        assert!(err.to_string().contains("/dev/input/does-not-exist"));
    }
}
