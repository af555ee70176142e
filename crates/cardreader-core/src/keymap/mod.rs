//! Key classification for the keystroke decoder.
//!
//! The decoder does not care which key was pressed, only whether it was a
//! digit (and which one), the terminator, or anything else.  Platform key
//! codes are reduced to a [`KeyClass`] at the capture boundary.

pub mod windows_vk;

use serde::{Deserialize, Serialize};

/// The decoder's input alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyClass {
    /// A decimal digit key, carrying its value `0..=9`.
    Digit(u8),
    /// The key that ends a card number when a terminator is required (Enter).
    Terminator,
    /// Any other key; ignored by the decoder.
    Other,
}

impl KeyClass {
    /// Returns the ASCII character for a digit class, `None` otherwise.
    pub fn digit_char(self) -> Option<char> {
        match self {
            KeyClass::Digit(d) if d <= 9 => Some(char::from(b'0' + d)),
            _ => None,
        }
    }
}

/// Unified key classifier.
pub struct KeyClassifier;

impl KeyClassifier {
    /// Classifies a Windows Virtual Key code.
    ///
    /// Returns [`KeyClass::Other`] for any code without a digit or terminator meaning.
    pub fn windows_vk(vk: u16) -> KeyClass {
        windows_vk::classify(vk)
    }
}
