//! Decoder for the bytes of a Windows `RAWINPUT` record.
//!
//! Layout (little-endian, pointer-sized fields follow the process bitness):
//! ```text
//! RAWINPUTHEADER: [dwType:4][dwSize:4][hDevice:P][wParam:P]
//! RAWKEYBOARD:    [MakeCode:2][Flags:2][Reserved:2][VKey:2][Message:4][ExtraInformation:4]
//! ```
//! The header is 24 bytes on 64-bit Windows and 16 bytes on 32-bit Windows;
//! the keyboard body is always 16 bytes.
//!
//! # Why decode bytes instead of casting to a struct? (for beginners)
//!
//! `GetRawInputData` fills a caller-supplied byte buffer.  Reinterpreting that
//! buffer as a `RAWINPUT` struct needs `unsafe` and trusts the OS-reported
//! size.  Reading the fields by offset keeps the parsing safe, testable on
//! any platform, and turns short or inconsistent buffers into a typed
//! [`PayloadError`] instead of undefined behaviour.

use thiserror::Error;

use crate::domain::device::DeviceHandle;
use crate::raw_input::event::{KeyEvent, KeyTransition};

/// `RIM_TYPEMOUSE`
pub const RIM_TYPEMOUSE: u32 = 0;
/// `RIM_TYPEKEYBOARD`
pub const RIM_TYPEKEYBOARD: u32 = 1;
/// `RIM_TYPEHID`
pub const RIM_TYPEHID: u32 = 2;

/// Size of `RAWKEYBOARD` in bytes.
pub const KEYBOARD_BODY_SIZE: usize = 16;

/// Errors that can occur while decoding a raw input payload.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PayloadError {
    /// The byte slice is shorter than the structure being read.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The header's `dwSize` claims more bytes than were delivered.
    #[error("declared size {declared} exceeds buffer of {available} bytes")]
    DeclaredSizeExceedsBuffer { declared: usize, available: usize },

    /// Only 4- and 8-byte pointers exist on Windows.
    #[error("unsupported pointer width: {0} bytes")]
    UnsupportedPointerWidth(usize),
}

/// Describes the pointer width of the process that produced the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputLayout {
    pub pointer_width: usize,
}

impl RawInputLayout {
    /// Layout of the running process.
    pub const NATIVE: Self = Self {
        pointer_width: std::mem::size_of::<usize>(),
    };

    /// Layout of a 64-bit process.
    pub const WIN64: Self = Self { pointer_width: 8 };

    /// Layout of a 32-bit process.
    pub const WIN32: Self = Self { pointer_width: 4 };

    /// Size of `RAWINPUTHEADER` under this layout.
    pub fn header_size(&self) -> usize {
        8 + 2 * self.pointer_width
    }

    fn validate(&self) -> Result<(), PayloadError> {
        match self.pointer_width {
            4 | 8 => Ok(()),
            other => Err(PayloadError::UnsupportedPointerWidth(other)),
        }
    }
}

impl Default for RawInputLayout {
    fn default() -> Self {
        Self::NATIVE
    }
}

/// The `RAWKEYBOARD` portion of a keyboard record, plus its source device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyboardRecord {
    pub device: DeviceHandle,
    pub make_code: u16,
    pub flags: u16,
    pub vkey: u16,
    pub message: u32,
    pub extra: u32,
}

impl RawKeyboardRecord {
    /// A `WM_KEYDOWN` record for `vkey` with every other field zeroed.
    pub fn key_down(device: DeviceHandle, vkey: u16) -> Self {
        Self {
            device,
            make_code: 0,
            flags: 0,
            vkey,
            message: crate::raw_input::event::WM_KEYDOWN,
            extra: 0,
        }
    }

    /// Converts the record into the decoder's key event.
    pub fn to_key_event(&self) -> KeyEvent {
        KeyEvent {
            device: self.device,
            vk_code: self.vkey,
            transition: KeyTransition::from_message(self.message),
        }
    }

    /// Serializes the record into a complete `RAWINPUT` buffer.
    ///
    /// The OS is the only real producer; this exists for test doubles and
    /// benchmarks that need realistic payloads.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::UnsupportedPointerWidth`] for layouts other
    /// than 4 or 8 bytes.
    pub fn to_bytes(&self, layout: RawInputLayout) -> Result<Vec<u8>, PayloadError> {
        layout.validate()?;
        let total = layout.header_size() + KEYBOARD_BODY_SIZE;
        let mut buf = Vec::with_capacity(total);

        buf.extend_from_slice(&RIM_TYPEKEYBOARD.to_le_bytes());
        buf.extend_from_slice(&(total as u32).to_le_bytes());
        write_pointer(&mut buf, self.device.value(), layout);
        write_pointer(&mut buf, 0, layout); // wParam: RIM_INPUT

        buf.extend_from_slice(&self.make_code.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // Reserved
        buf.extend_from_slice(&self.vkey.to_le_bytes());
        buf.extend_from_slice(&self.message.to_le_bytes());
        buf.extend_from_slice(&self.extra.to_le_bytes());
        Ok(buf)
    }
}

/// A decoded raw input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInputRecord {
    Keyboard(RawKeyboardRecord),
    /// Mouse or generic HID input; the decoder has no use for its body.
    Other { kind: u32, device: DeviceHandle },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes a `RAWINPUT` byte buffer.
///
/// Only the header and, for keyboard records, the `RAWKEYBOARD` body are
/// read.  Trailing bytes beyond `dwSize` are ignored.
///
/// # Errors
///
/// - [`PayloadError::UnsupportedPointerWidth`] if `layout` is neither 4 nor 8.
/// - [`PayloadError::InsufficientData`] if the buffer, or the size the header
///   declares, is too small for the header or keyboard body.
/// - [`PayloadError::DeclaredSizeExceedsBuffer`] if `dwSize` is larger than
///   the buffer.
///
/// # Examples
///
/// ```rust
/// use cardreader_core::raw_input::codec::{decode_raw_input, RawInputLayout, RawInputRecord, RawKeyboardRecord};
/// use cardreader_core::DeviceHandle;
///
/// let bytes = RawKeyboardRecord::key_down(DeviceHandle(7), 0x31)
///     .to_bytes(RawInputLayout::WIN64)
///     .unwrap();
/// match decode_raw_input(&bytes, RawInputLayout::WIN64).unwrap() {
///     RawInputRecord::Keyboard(kb) => assert_eq!(kb.vkey, 0x31),
///     other => panic!("unexpected record {other:?}"),
/// }
/// ```
pub fn decode_raw_input(bytes: &[u8], layout: RawInputLayout) -> Result<RawInputRecord, PayloadError> {
    layout.validate()?;
    let header_size = layout.header_size();
    ensure_len(bytes, header_size)?;

    let kind = read_u32(bytes, 0)?;
    let declared = read_u32(bytes, 4)? as usize;
    if declared > bytes.len() {
        return Err(PayloadError::DeclaredSizeExceedsBuffer {
            declared,
            available: bytes.len(),
        });
    }
    if declared < header_size {
        return Err(PayloadError::InsufficientData {
            needed: header_size,
            available: declared,
        });
    }
    let record = &bytes[..declared];
    let device = DeviceHandle(read_pointer(record, 8, layout)?);

    if kind != RIM_TYPEKEYBOARD {
        return Ok(RawInputRecord::Other { kind, device });
    }

    ensure_len(record, header_size + KEYBOARD_BODY_SIZE)?;
    let body = header_size;
    Ok(RawInputRecord::Keyboard(RawKeyboardRecord {
        device,
        make_code: read_u16(record, body)?,
        flags: read_u16(record, body + 2)?,
        vkey: read_u16(record, body + 6)?,
        message: read_u32(record, body + 8)?,
        extra: read_u32(record, body + 12)?,
    }))
}

/// Decodes a payload straight into a key event, or `None` for non-keyboard records.
///
/// # Errors
///
/// Propagates any [`PayloadError`] from [`decode_raw_input`].
pub fn decode_key_event(bytes: &[u8], layout: RawInputLayout) -> Result<Option<KeyEvent>, PayloadError> {
    Ok(match decode_raw_input(bytes, layout)? {
        RawInputRecord::Keyboard(kb) => Some(kb.to_key_event()),
        RawInputRecord::Other { .. } => None,
    })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn ensure_len(buf: &[u8], needed: usize) -> Result<(), PayloadError> {
    if buf.len() < needed {
        Err(PayloadError::InsufficientData {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16, PayloadError> {
    ensure_len(buf, offset + 2)?;
    Ok(u16::from_le_bytes([buf[offset], buf[offset + 1]]))
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32, PayloadError> {
    ensure_len(buf, offset + 4)?;
    Ok(u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

fn read_pointer(buf: &[u8], offset: usize, layout: RawInputLayout) -> Result<u64, PayloadError> {
    if layout.pointer_width == 4 {
        return read_u32(buf, offset).map(u64::from);
    }
    ensure_len(buf, offset + 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    Ok(u64::from_le_bytes(raw))
}

fn write_pointer(buf: &mut Vec<u8>, value: u64, layout: RawInputLayout) {
    if layout.pointer_width == 4 {
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard_bytes(layout: RawInputLayout, device: u64, vkey: u16, message: u32) -> Vec<u8> {
        RawKeyboardRecord {
            device: DeviceHandle(device),
            make_code: 0x02,
            flags: 0,
            vkey,
            message,
            extra: 0,
        }
        .to_bytes(layout)
        .expect("valid layout")
    }

    #[test]
    fn test_header_size_follows_pointer_width() {
        assert_eq!(RawInputLayout::WIN64.header_size(), 24);
        assert_eq!(RawInputLayout::WIN32.header_size(), 16);
    }

    #[test]
    fn test_decodes_64_bit_keyboard_record() {
        // Arrange
        let bytes = keyboard_bytes(RawInputLayout::WIN64, 0x0001_0000_0042, 0x35, 0x0100);

        // Act
        let record = decode_raw_input(&bytes, RawInputLayout::WIN64).expect("decode");

        // Assert
        let RawInputRecord::Keyboard(kb) = record else {
            panic!("expected keyboard record, got {record:?}");
        };
        assert_eq!(kb.device, DeviceHandle(0x0001_0000_0042));
        assert_eq!(kb.vkey, 0x35);
        assert_eq!(kb.make_code, 0x02);
        assert_eq!(kb.to_key_event().transition, KeyTransition::Pressed);
    }

    #[test]
    fn test_decodes_32_bit_keyboard_record() {
        let bytes = keyboard_bytes(RawInputLayout::WIN32, 0x1234, 0x0D, 0x0101);
        assert_eq!(bytes.len(), 32);

        let event = decode_key_event(&bytes, RawInputLayout::WIN32)
            .expect("decode")
            .expect("keyboard event");

        assert_eq!(event.device, DeviceHandle(0x1234));
        assert_eq!(event.vk_code, 0x0D);
        assert_eq!(event.transition, KeyTransition::Released);
    }

    #[test]
    fn test_empty_buffer_is_insufficient_data() {
        assert_eq!(
            decode_raw_input(&[], RawInputLayout::WIN64),
            Err(PayloadError::InsufficientData {
                needed: 24,
                available: 0
            })
        );
    }

    #[test]
    fn test_truncated_keyboard_body_is_rejected() {
        // Header claims only itself, so the keyboard body is missing.
        let mut bytes = keyboard_bytes(RawInputLayout::WIN64, 1, 0x31, 0x0100);
        bytes.truncate(30);
        bytes[4..8].copy_from_slice(&30u32.to_le_bytes());

        assert_eq!(
            decode_raw_input(&bytes, RawInputLayout::WIN64),
            Err(PayloadError::InsufficientData {
                needed: 40,
                available: 30
            })
        );
    }

    #[test]
    fn test_declared_size_larger_than_buffer_is_rejected() {
        let mut bytes = keyboard_bytes(RawInputLayout::WIN64, 1, 0x31, 0x0100);
        bytes[4..8].copy_from_slice(&64u32.to_le_bytes());

        assert_eq!(
            decode_raw_input(&bytes, RawInputLayout::WIN64),
            Err(PayloadError::DeclaredSizeExceedsBuffer {
                declared: 64,
                available: 40
            })
        );
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut bytes = keyboard_bytes(RawInputLayout::WIN64, 9, 0x39, 0x0100);
        bytes.extend_from_slice(&[0xFF; 8]);

        let event = decode_key_event(&bytes, RawInputLayout::WIN64)
            .expect("decode")
            .expect("keyboard event");
        assert_eq!(event.vk_code, 0x39);
    }

    #[test]
    fn test_mouse_record_is_other() {
        // Arrange: a mouse header followed by an arbitrary body.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&RIM_TYPEMOUSE.to_le_bytes());
        bytes.extend_from_slice(&48u32.to_le_bytes());
        bytes.extend_from_slice(&5u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 24]);

        // Act
        let record = decode_raw_input(&bytes, RawInputLayout::WIN64).expect("decode");

        // Assert
        assert_eq!(
            record,
            RawInputRecord::Other {
                kind: RIM_TYPEMOUSE,
                device: DeviceHandle(5)
            }
        );
        assert_eq!(decode_key_event(&bytes, RawInputLayout::WIN64), Ok(None));
    }

    #[test]
    fn test_unsupported_pointer_width() {
        let layout = RawInputLayout { pointer_width: 2 };
        assert_eq!(
            decode_raw_input(&[0u8; 64], layout),
            Err(PayloadError::UnsupportedPointerWidth(2))
        );
        let record = RawKeyboardRecord::key_down(DeviceHandle(1), 0x30);
        assert_eq!(
            record.to_bytes(layout),
            Err(PayloadError::UnsupportedPointerWidth(2))
        );
    }
}
