//! Validated card numbers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a candidate string was rejected as a card number.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum InvalidCardNumber {
    /// The candidate does not have the configured number of characters.
    #[error("expected {expected} digits, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// The candidate contains something other than ASCII decimal digits.
    #[error("non-digit character {0:?}")]
    NonDigit(char),
}

/// A card number read from the reader.
///
/// Can only be constructed through [`CardNumber::parse`], so holding one
/// guarantees the configured length and digits-only content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardNumber(String);

impl CardNumber {
    /// Validates `input` against the expected length.
    ///
    /// Input that is too short or too long is rejected, never truncated or padded.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCardNumber::WrongLength`] when the character count differs
    /// from `expected_len`, or [`InvalidCardNumber::NonDigit`] for the first
    /// character that is not `'0'..='9'`.
    pub fn parse(input: &str, expected_len: usize) -> Result<Self, InvalidCardNumber> {
        let actual = input.chars().count();
        if actual != expected_len {
            return Err(InvalidCardNumber::WrongLength {
                expected: expected_len,
                actual,
            });
        }
        if let Some(bad) = input.chars().find(|c| !c.is_ascii_digit()) {
            return Err(InvalidCardNumber::NonDigit(bad));
        }
        Ok(Self(input.to_string()))
    }

    /// Returns the digits as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the card number and returns the digit string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CardNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_exact_length_digits() {
        let card = CardNumber::parse("0123456789", 10).expect("valid card");
        assert_eq!(card.as_str(), "0123456789");
        assert_eq!(card.to_string(), "0123456789");
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert_eq!(
            CardNumber::parse("12345", 10),
            Err(InvalidCardNumber::WrongLength {
                expected: 10,
                actual: 5
            })
        );
    }

    #[test]
    fn test_parse_rejects_long_input_without_truncating() {
        assert_eq!(
            CardNumber::parse("012345678901", 10),
            Err(InvalidCardNumber::WrongLength {
                expected: 10,
                actual: 12
            })
        );
    }

    #[test]
    fn test_parse_rejects_non_digit_content() {
        assert_eq!(
            CardNumber::parse("01234A6789", 10),
            Err(InvalidCardNumber::NonDigit('A'))
        );
    }

    #[test]
    fn test_parse_rejects_unicode_digits() {
        // Arabic-Indic digit five is numeric but not an ASCII decimal digit.
        assert_eq!(
            CardNumber::parse("012\u{0665}", 4),
            Err(InvalidCardNumber::NonDigit('\u{0665}'))
        );
    }
}
