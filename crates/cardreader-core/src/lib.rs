//! # cardreader-core
//!
//! Shared library for the HID card reader agent containing the domain
//! entities, key classification tables, and the raw input payload codec.
//!
//! It has zero dependencies on OS APIs, UI frameworks, or timers.
//!
//! # Architecture overview (for beginners)
//!
//! A card reader that emulates a keyboard "types" the card number it reads,
//! one key press per digit, usually followed by Enter.  The operating system
//! cannot tell those key presses apart from a real keyboard, so the agent has
//! to pick one physical device and decode its keystrokes itself.
//!
//! This crate (`cardreader-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure business types with no OS dependencies: device
//!   identity and its human-readable name, decoder configuration, validated
//!   card numbers, and the diagnostics the decoder reports.
//!
//! - **`keymap`** – The classification table that turns a Windows virtual key
//!   code into "digit", "terminator", or "something else".
//!
//! - **`raw_input`** – How bytes delivered by the OS raw input layer are
//!   decoded into typed key events.

pub mod domain;
pub mod keymap;
pub mod raw_input;

// Re-export the most-used types at the crate root so callers can write
// `cardreader_core::DeviceHandle` instead of `cardreader_core::domain::device::DeviceHandle`.
pub use domain::card::{CardNumber, InvalidCardNumber};
pub use domain::config::{DecoderConfig, DecoderConfigError, StaleBufferPolicy};
pub use domain::device::{DeviceHandle, DeviceIdentity};
pub use domain::diagnostic::{Diagnostic, DiagnosticLevel};
pub use keymap::KeyClass;
pub use raw_input::codec::{decode_raw_input, PayloadError};
pub use raw_input::event::{KeyEvent, KeyTransition};
