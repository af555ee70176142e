//! Typed keyboard events.

use serde::{Deserialize, Serialize};

use crate::domain::device::DeviceHandle;
use crate::keymap::{KeyClass, KeyClassifier};

/// `WM_KEYDOWN`: the only keyboard message the decoder acts on.
pub const WM_KEYDOWN: u32 = 0x0100;

/// Whether a key went down or came up.
///
/// Key-repeat and system-key messages (`WM_SYSKEYDOWN`, etc.) are reported as
/// [`KeyTransition::Released`] so the decoder ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyTransition {
    Pressed,
    Released,
}

impl KeyTransition {
    /// Maps a raw keyboard `Message` field onto a transition.
    pub fn from_message(message: u32) -> Self {
        if message == WM_KEYDOWN {
            KeyTransition::Pressed
        } else {
            KeyTransition::Released
        }
    }
}

/// One key press or release reported by a specific device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// The device that produced the event.
    pub device: DeviceHandle,
    /// Windows virtual key code.
    pub vk_code: u16,
    pub transition: KeyTransition,
}

impl KeyEvent {
    /// Convenience constructor for a key press.
    pub fn pressed(device: DeviceHandle, vk_code: u16) -> Self {
        Self {
            device,
            vk_code,
            transition: KeyTransition::Pressed,
        }
    }

    /// Convenience constructor for a key release.
    pub fn released(device: DeviceHandle, vk_code: u16) -> Self {
        Self {
            device,
            vk_code,
            transition: KeyTransition::Released,
        }
    }

    /// Returns the decoder's view of this key.
    pub fn class(&self) -> KeyClass {
        KeyClassifier::windows_vk(self.vk_code)
    }

    pub fn is_press(&self) -> bool {
        self.transition == KeyTransition::Pressed
    }
}
