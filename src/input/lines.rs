//! Line-oriented key source for terminals.
//!
//! Each non-empty line contributes its first character as a key press. Used
//! by the launcher in local mode, where the terminal stands in for the
//! profile menu.

use std::io::{self, BufRead, BufReader, Stdin};

use super::{InputError, KeySource};
use crate::command::{InputKey, KeyEvent};

pub struct LineKeys<R> {
    reader: R,
    name: String,
}

impl LineKeys<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()), "terminal")
    }
}

impl<R: BufRead> LineKeys<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
        }
    }
}

impl<R: BufRead + Send> KeySource for LineKeys<R> {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn next_event(&mut self) -> Result<Option<KeyEvent>, InputError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if let Some(c) = line.trim().chars().next() {
                return Ok(Some(KeyEvent::down(InputKey::from_char(c))));
            }
        }
    }
}
