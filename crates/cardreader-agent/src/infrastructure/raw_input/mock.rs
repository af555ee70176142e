//! Mock raw input collaborator for testing.
//!
//! Plays the OS side of the Raw Input API: it owns a fake device list and
//! registry, records registration attempts, and builds the `RAWINPUT` byte
//! payloads a `WM_INPUT` message would carry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use cardreader_core::raw_input::codec::{RawInputLayout, RawKeyboardRecord};
use cardreader_core::DeviceHandle;

use super::{RawInputRegistrar, RegistrationError, WindowTarget};
use crate::application::device_catalog::{
    CatalogError, RawDeviceEntry, RawDeviceKind, RawDeviceProvider,
};

#[derive(Default)]
struct MockState {
    devices: Vec<(RawDeviceEntry, Option<String>)>,
    registry: HashMap<String, String>,
    list_error: Option<String>,
    registration_error: Option<RegistrationError>,
    registrations: Vec<WindowTarget>,
}

/// A scriptable stand-in for the OS raw input layer.
#[derive(Clone, Default)]
pub struct MockRawInput {
    state: Arc<Mutex<MockState>>,
}

impl MockRawInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a device; `raw_name` of `None` simulates an unreadable interface path.
    pub fn add_device(&self, handle: DeviceHandle, kind: RawDeviceKind, raw_name: Option<&str>) {
        self.state()
            .devices
            .push((RawDeviceEntry { handle, kind }, raw_name.map(str::to_string)));
    }

    /// Removes a device, as if it were unplugged.
    pub fn remove_device(&self, handle: DeviceHandle) {
        self.state().devices.retain(|(e, _)| e.handle != handle);
    }

    /// Adds a registry description for a device-instance path.
    pub fn set_friendly_name(&self, instance_path: &str, description: &str) {
        self.state()
            .registry
            .insert(instance_path.to_string(), description.to_string());
    }

    /// Makes the next device-list calls fail with `reason`; `None` restores success.
    pub fn fail_enumeration(&self, reason: Option<&str>) {
        self.state().list_error = reason.map(str::to_string);
    }

    /// Makes registration fail with `error`; `None` restores success.
    pub fn fail_registration(&self, error: Option<RegistrationError>) {
        self.state().registration_error = error;
    }

    /// Windows passed to `register_keyboard_sink`, successful or not.
    pub fn registrations(&self) -> Vec<WindowTarget> {
        self.state().registrations.clone()
    }

    /// Payload for a `WM_KEYDOWN` of `vkey` from `device`.
    pub fn key_down_payload(device: DeviceHandle, vkey: u16) -> Vec<u8> {
        Self::payload(RawKeyboardRecord::key_down(device, vkey))
    }

    /// Payload for a `WM_KEYUP` of `vkey` from `device`.
    pub fn key_up_payload(device: DeviceHandle, vkey: u16) -> Vec<u8> {
        let mut record = RawKeyboardRecord::key_down(device, vkey);
        record.message = 0x0101;
        record.flags = 0x0001; // RI_KEY_BREAK
        Self::payload(record)
    }

    /// Payloads for typing `digits` on the main row.
    pub fn typed_payloads(device: DeviceHandle, digits: &str) -> Vec<Vec<u8>> {
        digits
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| Self::key_down_payload(device, 0x30 + d as u16))
            .collect()
    }

    fn payload(record: RawKeyboardRecord) -> Vec<u8> {
        match record.to_bytes(RawInputLayout::NATIVE) {
            Ok(bytes) => bytes,
            // NATIVE is always 4 or 8 bytes wide.
            Err(_) => Vec::new(),
        }
    }
}

impl RawDeviceProvider for MockRawInput {
    fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, CatalogError> {
        let state = self.state();
        if let Some(reason) = &state.list_error {
            return Err(CatalogError::ListFailed(reason.clone()));
        }
        Ok(state.devices.iter().map(|(e, _)| *e).collect())
    }

    fn device_name(&self, handle: DeviceHandle) -> Option<String> {
        self.state()
            .devices
            .iter()
            .find(|(e, _)| e.handle == handle)
            .and_then(|(_, name)| name.clone())
    }

    fn friendly_name(&self, instance_path: &str) -> Option<String> {
        self.state().registry.get(instance_path).cloned()
    }
}

impl RawInputRegistrar for MockRawInput {
    fn register_keyboard_sink(&self, target: WindowTarget) -> Result<(), RegistrationError> {
        let mut state = self.state();
        state.registrations.push(target);
        match &state.registration_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
