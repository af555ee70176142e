//! Diagnostics reported through the log channel.
//!
//! Each variant is one decision or failure worth telling the operator about.
//! The `Display` implementation produces the log line; [`Diagnostic::level`]
//! says how loud it should be.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::device::DeviceHandle;

/// Severity of a [`Diagnostic`], mirrored onto `tracing` levels by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warn,
}

/// A diagnostic message produced by the catalog, selector, or decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// `configure` replaced the decoder settings.
    ConfigUpdated {
        card_length: usize,
        require_terminator: bool,
    },
    /// Enumeration succeeded and found keyboard-class devices.
    DevicesFound { count: usize },
    /// Enumeration succeeded but no keyboard-class device survived filtering.
    NoDevicesFound,
    /// The OS enumeration call itself failed.
    EnumerationFailed { reason: String },
    /// The decoder now only accepts events from `handle`.
    DeviceBound {
        handle: DeviceHandle,
        display_name: String,
    },
    /// The decoder accepts events from any device again.
    DeviceUnbound,
    /// A digit was appended to the buffer.
    DigitReceived { digit: char, buffered: usize },
    /// The buffer was drained for validation.
    InputReceived { input: String },
    /// The drained buffer is a valid card number.
    CardAccepted { card_number: String },
    /// The drained buffer failed length or digit validation.
    InvalidInput { input: String, expected_len: usize },
    /// The inactivity timeout discarded a partial buffer.
    TimeoutCleared { buffered: usize },
    /// A raw input payload could not be decoded.
    MalformedEvent { reason: String },
    /// Background keyboard delivery was registered with the OS.
    RegistrationSucceeded,
    /// The OS refused background keyboard delivery.
    RegistrationFailed { reason: String },
    /// The decoder was shut down and ignores further input.
    Stopped,
}

impl Diagnostic {
    /// Returns how loudly this diagnostic should be logged.
    pub fn level(&self) -> DiagnosticLevel {
        match self {
            Diagnostic::DigitReceived { .. } | Diagnostic::InputReceived { .. } => {
                DiagnosticLevel::Debug
            }
            Diagnostic::ConfigUpdated { .. }
            | Diagnostic::DevicesFound { .. }
            | Diagnostic::DeviceBound { .. }
            | Diagnostic::DeviceUnbound
            | Diagnostic::CardAccepted { .. }
            | Diagnostic::RegistrationSucceeded
            | Diagnostic::Stopped => DiagnosticLevel::Info,
            Diagnostic::NoDevicesFound
            | Diagnostic::EnumerationFailed { .. }
            | Diagnostic::InvalidInput { .. }
            | Diagnostic::TimeoutCleared { .. }
            | Diagnostic::MalformedEvent { .. }
            | Diagnostic::RegistrationFailed { .. } => DiagnosticLevel::Warn,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ConfigUpdated {
                card_length,
                require_terminator,
            } => write!(
                f,
                "configuration updated: card length={card_length}, require terminator={require_terminator}"
            ),
            Diagnostic::DevicesFound { count } => write!(f, "found {count} keyboard device(s)"),
            Diagnostic::NoDevicesFound => f.write_str("no input devices found"),
            Diagnostic::EnumerationFailed { reason } => {
                write!(f, "device enumeration failed: {reason}")
            }
            Diagnostic::DeviceBound {
                handle,
                display_name,
            } => write!(
                f,
                "listening to {display_name} (handle {handle}); other keyboards are ignored"
            ),
            Diagnostic::DeviceUnbound => f.write_str("stopped listening"),
            Diagnostic::DigitReceived { digit, buffered } => {
                write!(f, "received digit {digit} (buffer length {buffered})")
            }
            Diagnostic::InputReceived { input } => {
                write!(f, "processing input {input:?} (length {})", input.chars().count())
            }
            Diagnostic::CardAccepted { card_number } => {
                write!(f, "recognised card number {card_number}")
            }
            Diagnostic::InvalidInput {
                input,
                expected_len,
            } => write!(
                f,
                "invalid input {input:?}: length is not {expected_len} or contains non-digit characters"
            ),
            Diagnostic::TimeoutCleared { buffered } => {
                write!(f, "input timed out, buffer cleared (length {buffered})")
            }
            Diagnostic::MalformedEvent { reason } => {
                write!(f, "dropped raw input event: {reason}")
            }
            Diagnostic::RegistrationSucceeded => {
                f.write_str("raw input registered (background delivery enabled)")
            }
            Diagnostic::RegistrationFailed { reason } => {
                write!(f, "raw input registration failed: {reason}")
            }
            Diagnostic::Stopped => f.write_str("decoder stopped"),
        }
    }
}
