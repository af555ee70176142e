//! Raw input infrastructure for the card reader agent.
//!
//! On Windows, keyboard-emulating readers are read through the Raw Input API:
//! the agent registers a hidden message-only window for background keyboard
//! delivery (`RIDEV_INPUTSINK`), and every `WM_INPUT` message carries a
//! `RAWINPUT` record that names the device that produced it.  That device
//! handle is what lets the decoder ignore every keyboard except the reader.
//!
//! # Why Raw Input and not a keyboard hook? (for beginners)
//!
//! A low-level keyboard hook (`WH_KEYBOARD_LL`) sees every key press on the
//! system but cannot tell which physical keyboard produced it.  Raw Input
//! reports the source device handle with each event, which is exactly the
//! identity the decoder filters on.
//!
//! # Testability
//!
//! The [`RawInputRegistrar`] trait (and
//! [`RawDeviceProvider`](crate::application::device_catalog::RawDeviceProvider))
//! let tests run against [`mock::MockRawInput`] on any platform.

use thiserror::Error;

use crate::application::device_catalog::{CatalogError, RawDeviceEntry, RawDeviceProvider};
use cardreader_core::DeviceHandle;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// HID usage page for generic desktop controls.
pub const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
/// HID usage for keyboards on the generic desktop page.
pub const HID_USAGE_GENERIC_KEYBOARD: u16 = 0x06;

/// The OS window that receives raw input messages, as a raw `HWND` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowTarget(pub isize);

/// Error type for raw input registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The OS refused the registration.
    #[error("RegisterRawInputDevices failed: {0}")]
    Rejected(String),
    /// The hidden receiver window could not be created.
    #[error("failed to create the raw input window: {0}")]
    WindowCreation(String),
    /// Raw input is a Windows API.
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// OS collaborator that enables background keyboard delivery to a window.
pub trait RawInputRegistrar: Send + Sync {
    /// Registers `target` for keyboard raw input (usage page 0x01, usage
    /// 0x06) with delivery even when the window is not in the foreground.
    fn register_keyboard_sink(&self, target: WindowTarget) -> Result<(), RegistrationError>;
}

/// Raw input stand-in for platforms without the Raw Input API.
///
/// Enumeration and registration both fail, which leaves the agent running
/// in degraded mode instead of refusing to start.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPlatform;

impl RawDeviceProvider for UnsupportedPlatform {
    fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, CatalogError> {
        Err(CatalogError::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }

    fn device_name(&self, _handle: DeviceHandle) -> Option<String> {
        None
    }

    fn friendly_name(&self, _instance_path: &str) -> Option<String> {
        None
    }
}

impl RawInputRegistrar for UnsupportedPlatform {
    fn register_keyboard_sink(&self, _target: WindowTarget) -> Result<(), RegistrationError> {
        Err(RegistrationError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_fails_enumeration() {
        assert!(matches!(
            UnsupportedPlatform.list_devices(),
            Err(CatalogError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_unsupported_platform_fails_registration() {
        let err = UnsupportedPlatform
            .register_keyboard_sink(WindowTarget(0))
            .unwrap_err();
        assert!(err.to_string().starts_with("platform not supported"));
    }
}
