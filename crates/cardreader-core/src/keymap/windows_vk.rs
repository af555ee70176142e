//! Windows Virtual Key (VK) code classification table.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).
//!
//! # What is a Windows Virtual Key (VK) code? (for beginners)
//!
//! Windows assigns each keyboard key a number called a "Virtual Key code",
//! defined in `<winuser.h>` and named `VK_*` (e.g., `VK_RETURN = 0x0D`).
//! A card reader that emulates a keyboard sends one VK per digit.  Depending
//! on the reader's firmware the digits arrive either from the main row
//! (`'0'..'9'` = `0x30..0x39`) or from the numeric keypad
//! (`VK_NUMPAD0..VK_NUMPAD9` = `0x60..0x69`); both mean the same digit.
//!
//! # How this table works
//!
//! `VK_CLASS_TABLE` is a compile-time constant array of 256 [`KeyClass`]
//! values indexed by VK code.  The raw input layer reports VKs as `u16`;
//! anything above `0xFF` is not a real virtual key and classifies as
//! [`KeyClass::Other`].

use super::KeyClass;

/// `VK_RETURN`: the terminator key.
pub const VK_RETURN: u16 = 0x0D;
/// `'0'` on the main alphanumeric row.
pub const VK_0: u16 = 0x30;
/// `'9'` on the main alphanumeric row.
pub const VK_9: u16 = 0x39;
/// `VK_NUMPAD0`.
pub const VK_NUMPAD0: u16 = 0x60;
/// `VK_NUMPAD9`.
pub const VK_NUMPAD9: u16 = 0x69;

/// Classifies a Windows Virtual Key code.
///
/// # Panics
///
/// This function never panics; all `u16` inputs are handled.
pub fn classify(vk: u16) -> KeyClass {
    VK_CLASS_TABLE
        .get(vk as usize)
        .copied()
        .unwrap_or(KeyClass::Other)
}

/// Returns the main-row VK code for a digit, the inverse used by test input generators.
pub fn digit_to_vk(digit: u8) -> Option<u16> {
    (digit <= 9).then(|| VK_0 + u16::from(digit))
}

/// Returns the numeric-keypad VK code for a digit.
pub fn digit_to_numpad_vk(digit: u8) -> Option<u16> {
    (digit <= 9).then(|| VK_NUMPAD0 + u16::from(digit))
}

/// Complete VK → [`KeyClass`] table indexed by VK code (0x00–0xFF).
const VK_CLASS_TABLE: [KeyClass; 256] = {
    use KeyClass::*;
    let mut t = [Other; 256];

    // ── Digit row (VK_0=0x30 … VK_9=0x39) ───────────────────────────────────
    t[0x30] = Digit(0);
    t[0x31] = Digit(1);
    t[0x32] = Digit(2);
    t[0x33] = Digit(3);
    t[0x34] = Digit(4);
    t[0x35] = Digit(5);
    t[0x36] = Digit(6);
    t[0x37] = Digit(7);
    t[0x38] = Digit(8);
    t[0x39] = Digit(9);

    // ── Numeric keypad (VK_NUMPAD0=0x60 … VK_NUMPAD9=0x69) ───────────────────
    t[0x60] = Digit(0);
    t[0x61] = Digit(1);
    t[0x62] = Digit(2);
    t[0x63] = Digit(3);
    t[0x64] = Digit(4);
    t[0x65] = Digit(5);
    t[0x66] = Digit(6);
    t[0x67] = Digit(7);
    t[0x68] = Digit(8);
    t[0x69] = Digit(9);

    // ── Terminator ───────────────────────────────────────────────────────────
    t[0x0D] = Terminator; // VK_RETURN

    t
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_row_digits_classify_as_digits() {
        for d in 0..=9u8 {
            assert_eq!(classify(VK_0 + u16::from(d)), KeyClass::Digit(d));
        }
    }

    #[test]
    fn test_numpad_digits_map_to_same_digit() {
        for d in 0..=9u8 {
            assert_eq!(classify(VK_NUMPAD0 + u16::from(d)), KeyClass::Digit(d));
        }
    }

    #[test]
    fn test_return_is_terminator() {
        assert_eq!(classify(VK_RETURN), KeyClass::Terminator);
    }

    #[test]
    fn test_neighbouring_codes_are_other() {
        // '/' just below '0', ':' just above '9', VK_MULTIPLY after VK_NUMPAD9.
        assert_eq!(classify(0x2F), KeyClass::Other);
        assert_eq!(classify(0x3A), KeyClass::Other);
        assert_eq!(classify(0x5F), KeyClass::Other);
        assert_eq!(classify(0x6A), KeyClass::Other);
        assert_eq!(classify(0x41), KeyClass::Other); // VK_A
    }

    #[test]
    fn test_codes_above_table_are_other() {
        assert_eq!(classify(0x0130), KeyClass::Other);
        assert_eq!(classify(u16::MAX), KeyClass::Other);
    }

    #[test]
    fn test_digit_to_vk_round_trips_through_classify() {
        assert_eq!(digit_to_vk(4), Some(0x34));
        assert_eq!(digit_to_numpad_vk(4), Some(0x64));
        assert_eq!(digit_to_vk(10), None);
    }
}
