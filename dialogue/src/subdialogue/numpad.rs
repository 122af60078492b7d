//! Amount keypad: digits into a buffer, then a review screen.

use chrono::NaiveDate;
use finbot_core::{Button, Keyboard};
use serde::{Deserialize, Serialize};

use super::{Screen, SubDialogue, SubStep};
use crate::intent::{Intent, NumpadKey};

pub const DEFAULT_MAX_LEN: usize = 12;
const MAX_DECIMALS: usize = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NumpadScratch {
    pub buffer: String,
}

#[derive(Debug, Clone, Copy)]
pub struct AmountKeypad {
    max_len: usize,
}

impl Default for AmountKeypad {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

impl AmountKeypad {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Buffer after pressing `key`, or `None` when the key would not change it or would
    /// break the number format.
    pub fn press(&self, buffer: &str, key: NumpadKey) -> Option<String> {
        let mut next = buffer.to_string();
        match key {
            NumpadKey::Digit(d) => {
                if buffer == "0" {
                    if d == 0 {
                        return None;
                    }
                    next.clear();
                } else if buffer.len() >= self.max_len {
                    return None;
                }
                if let Some((_, decimals)) = buffer.split_once('.') {
                    if decimals.len() >= MAX_DECIMALS {
                        return None;
                    }
                }
                next.push(char::from(b'0' + d));
            }
            NumpadKey::Dot => {
                if buffer.contains('.') || buffer.len() + 1 >= self.max_len {
                    return None;
                }
                if buffer.is_empty() {
                    next.push('0');
                }
                next.push('.');
            }
            NumpadKey::Backspace => {
                next.pop()?;
            }
            NumpadKey::Clear => {
                if buffer.is_empty() {
                    return None;
                }
                next.clear();
            }
        }
        Some(next)
    }

    pub fn pad() -> Keyboard {
        let key = |label: &str, k: NumpadKey| {
            Button::new(label, Intent::NumpadKey(k).payload().unwrap_or_default())
        };
        let digits = |row: [u8; 3]| {
            row.iter()
                .map(|d| key(&d.to_string(), NumpadKey::Digit(*d)))
                .collect::<Vec<_>>()
        };

        Keyboard::new()
            .row(digits([1, 2, 3]))
            .row(digits([4, 5, 6]))
            .row(digits([7, 8, 9]))
            .row(vec![
                key(".", NumpadKey::Dot),
                key("0", NumpadKey::Digit(0)),
                key("⌫", NumpadKey::Backspace),
            ])
            .row(vec![
                key("C", NumpadKey::Clear),
                Button::new("OK", Intent::NumpadDone.payload().unwrap_or_default()),
            ])
    }

    fn pad_screen(buffer: &str) -> Screen {
        let shown = if buffer.is_empty() { "0" } else { buffer };
        Screen {
            keyboard: Self::pad(),
            note: Some(format!("Amount: {}", shown)),
        }
    }

    fn review_screen(buffer: &str) -> Screen {
        Screen {
            keyboard: Keyboard::new().row(vec![
                Button::new("OK", Intent::NumpadConfirm.payload().unwrap_or_default()),
                Button::new("Back", Intent::NumpadBack.payload().unwrap_or_default()),
            ]),
            note: Some(format!("Amount: {}", buffer.trim_end_matches('.'))),
        }
    }
}

impl SubDialogue for AmountKeypad {
    type Scratch = NumpadScratch;

    fn name(&self) -> &'static str {
        "numpad"
    }

    fn open(&self, _today: NaiveDate) -> (NumpadScratch, Screen) {
        (NumpadScratch::default(), Self::pad_screen(""))
    }

    fn handles_control(&self, intent: &Intent) -> bool {
        matches!(intent, Intent::NumpadKey(_) | Intent::NumpadDone)
    }

    fn handles_end(&self, intent: &Intent) -> bool {
        matches!(intent, Intent::NumpadConfirm | Intent::NumpadBack)
    }

    fn control(&self, scratch: &mut NumpadScratch, intent: &Intent) -> SubStep {
        match intent {
            Intent::NumpadKey(key) => match self.press(&scratch.buffer, *key) {
                Some(next) => {
                    scratch.buffer = next;
                    SubStep::Stay(Self::pad_screen(&scratch.buffer))
                }
                None => SubStep::Ignore,
            },
            Intent::NumpadDone if !scratch.buffer.is_empty() => {
                SubStep::Review(Self::review_screen(&scratch.buffer))
            }
            _ => SubStep::Ignore,
        }
    }

    fn finish(&self, scratch: &mut NumpadScratch, intent: &Intent) -> SubStep {
        match intent {
            Intent::NumpadConfirm => {
                SubStep::Done(scratch.buffer.trim_end_matches('.').to_string())
            }
            Intent::NumpadBack => SubStep::Back(Self::pad_screen(&scratch.buffer)),
            _ => SubStep::Ignore,
        }
    }
}
