//! DeviceCatalog: lists the keyboard-class devices a reader could be.
//!
//! Every call to [`DeviceCatalog::enumerate`] asks the OS for a fresh device
//! list.  Handles from an older pass are not reused; the catalog only keeps
//! the most recent pass around so the UI can look names up without another
//! OS round-trip.

use std::sync::{Arc, Mutex, PoisonError};

use cardreader_core::{DeviceHandle, DeviceIdentity, Diagnostic};
use thiserror::Error;

use super::event_sink::EventSink;

/// Error type for OS device enumeration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The OS device-list call failed.
    #[error("device list query failed: {0}")]
    ListFailed(String),
    /// Raw input devices cannot be enumerated on this platform.
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Device class reported by the OS for a raw input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawDeviceKind {
    Mouse,
    Keyboard,
    Hid,
}

/// One entry of the OS raw input device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDeviceEntry {
    pub handle: DeviceHandle,
    pub kind: RawDeviceKind,
}

/// OS collaborator that knows which raw input devices exist.
///
/// The Windows implementation calls `GetRawInputDeviceList` and friends;
/// tests use a mock.
#[cfg_attr(test, mockall::automock)]
pub trait RawDeviceProvider: Send + Sync {
    /// Lists every raw input device with its class.
    fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, CatalogError>;

    /// Returns the device interface path for `handle`, or `None` if it cannot be read.
    fn device_name(&self, handle: DeviceHandle) -> Option<String>;

    /// Looks up the registry description for a device-instance path.
    fn friendly_name(&self, instance_path: &str) -> Option<String>;
}

/// Use case for listing candidate reader devices.
pub struct DeviceCatalog {
    provider: Arc<dyn RawDeviceProvider>,
    sink: Arc<EventSink>,
    last_pass: Mutex<Vec<DeviceIdentity>>,
}

impl DeviceCatalog {
    pub fn new(provider: Arc<dyn RawDeviceProvider>, sink: Arc<EventSink>) -> Self {
        Self {
            provider,
            sink,
            last_pass: Mutex::new(Vec::new()),
        }
    }

    /// Enumerates keyboard-class devices.
    ///
    /// Devices whose interface path cannot be read (or is empty) are left
    /// out.  An OS failure yields an empty list and an `EnumerationFailed`
    /// diagnostic rather than an error.
    pub fn enumerate(&self) -> Vec<DeviceIdentity> {
        let entries = match self.provider.list_devices() {
            Ok(entries) => entries,
            Err(err) => {
                self.sink.publish_log(Diagnostic::EnumerationFailed {
                    reason: err.to_string(),
                });
                self.store(Vec::new());
                return Vec::new();
            }
        };

        let devices: Vec<DeviceIdentity> = entries
            .into_iter()
            .filter(|entry| entry.kind == RawDeviceKind::Keyboard)
            .filter_map(|entry| {
                let raw_name = self.provider.device_name(entry.handle)?;
                if raw_name.is_empty() {
                    return None;
                }
                Some(DeviceIdentity::new(entry.handle, raw_name, |path| {
                    self.provider.friendly_name(path)
                }))
            })
            .collect();

        if devices.is_empty() {
            self.sink.publish_log(Diagnostic::NoDevicesFound);
        } else {
            self.sink.publish_log(Diagnostic::DevicesFound {
                count: devices.len(),
            });
        }

        self.store(devices.clone());
        devices
    }

    /// Devices returned by the most recent [`enumerate`](Self::enumerate) call.
    pub fn last_pass(&self) -> Vec<DeviceIdentity> {
        self.last_pass
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Finds `handle` in the most recent pass.
    pub fn find(&self, handle: DeviceHandle) -> Option<DeviceIdentity> {
        self.last_pass
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|d| d.handle == handle)
            .cloned()
    }

    fn store(&self, devices: Vec<DeviceIdentity>) {
        *self
            .last_pass
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = devices;
    }
}

/// Returns the devices whose raw or display name contains one of the
/// `;`-separated `keywords`, compared case-insensitively.
///
/// Blank keywords are ignored, so an empty keyword list matches nothing.
pub fn matching_keywords<'a>(
    devices: &'a [DeviceIdentity],
    keywords: &str,
) -> Vec<&'a DeviceIdentity> {
    let needles: Vec<String> = keywords
        .split(';')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_lowercase)
        .collect();

    devices
        .iter()
        .filter(|d| {
            let raw = d.raw_name.to_lowercase();
            let display = d.display_name.to_lowercase();
            needles
                .iter()
                .any(|n| raw.contains(n.as_str()) || display.contains(n.as_str()))
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    const KBD_PATH: &str =
        r"\\?\HID#VID_1A2C&PID_6004&MI_00#7&1234abcd&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}";

    fn entry(handle: u64, kind: RawDeviceKind) -> RawDeviceEntry {
        RawDeviceEntry {
            handle: DeviceHandle(handle),
            kind,
        }
    }

    fn catalog(mock: MockRawDeviceProvider) -> (DeviceCatalog, Arc<EventSink>) {
        let sink = Arc::new(EventSink::new());
        (DeviceCatalog::new(Arc::new(mock), Arc::clone(&sink)), sink)
    }

    #[test]
    fn test_enumerate_keeps_only_keyboards() {
        // Arrange
        let mut mock = MockRawDeviceProvider::new();
        mock.expect_list_devices().returning(|| {
            Ok(vec![
                entry(1, RawDeviceKind::Mouse),
                entry(2, RawDeviceKind::Keyboard),
                entry(3, RawDeviceKind::Hid),
            ])
        });
        mock.expect_device_name()
            .with(eq(DeviceHandle(2)))
            .times(1)
            .returning(|_| Some(KBD_PATH.to_string()));
        mock.expect_friendly_name().returning(|_| None);
        let (catalog, sink) = catalog(mock);
        let mut logs = sink.subscribe_logs();

        // Act
        let devices = catalog.enumerate();

        // Assert
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].handle, DeviceHandle(2));
        assert_eq!(devices[0].display_name, "HID keyboard (VID:1A2C PID:6004)");
        assert_eq!(
            logs.try_recv().unwrap().0,
            Diagnostic::DevicesFound { count: 1 }
        );
    }

    #[test]
    fn test_enumerate_skips_unreadable_and_empty_names() {
        let mut mock = MockRawDeviceProvider::new();
        mock.expect_list_devices().returning(|| {
            Ok(vec![
                entry(1, RawDeviceKind::Keyboard),
                entry(2, RawDeviceKind::Keyboard),
                entry(3, RawDeviceKind::Keyboard),
            ])
        });
        mock.expect_device_name().returning(|h| match h.value() {
            1 => None,
            2 => Some(String::new()),
            _ => Some(KBD_PATH.to_string()),
        });
        mock.expect_friendly_name().returning(|_| None);
        let (catalog, _) = catalog(mock);

        let devices = catalog.enumerate();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].handle, DeviceHandle(3));
    }

    #[test]
    fn test_enumerate_uses_registry_friendly_name() {
        // Arrange
        let mut mock = MockRawDeviceProvider::new();
        mock.expect_list_devices()
            .returning(|| Ok(vec![entry(7, RawDeviceKind::Keyboard)]));
        mock.expect_device_name()
            .returning(|_| Some(KBD_PATH.to_string()));
        mock.expect_friendly_name()
            .with(eq(r"HID\VID_1A2C&PID_6004&MI_00\7&1234abcd&0&0000"))
            .returning(|_| Some("@keyboard.inf,%hid_device_system_keyboard%;HID Keyboard Device".into()));
        let (catalog, _) = catalog(mock);

        // Act
        let devices = catalog.enumerate();

        // Assert
        assert_eq!(devices[0].display_name, "HID Keyboard Device");
    }

    #[test]
    fn test_enumeration_failure_returns_empty_and_reports() {
        // Arrange
        let mut mock = MockRawDeviceProvider::new();
        mock.expect_list_devices()
            .returning(|| Err(CatalogError::ListFailed("access denied".into())));
        mock.expect_device_name().never();
        let (catalog, sink) = catalog(mock);
        let mut logs = sink.subscribe_logs();

        // Act
        let devices = catalog.enumerate();

        // Assert
        assert!(devices.is_empty());
        assert_eq!(
            logs.try_recv().unwrap().0,
            Diagnostic::EnumerationFailed {
                reason: "device list query failed: access denied".into()
            }
        );
    }

    #[test]
    fn test_zero_devices_is_not_an_error() {
        let mut mock = MockRawDeviceProvider::new();
        mock.expect_list_devices().returning(|| Ok(Vec::new()));
        let (catalog, sink) = catalog(mock);
        let mut logs = sink.subscribe_logs();

        assert!(catalog.enumerate().is_empty());
        assert_eq!(logs.try_recv().unwrap().0, Diagnostic::NoDevicesFound);
    }

    #[test]
    fn test_each_pass_replaces_the_last() {
        // Arrange: first pass sees handle 1, second pass sees handle 2
        let mut mock = MockRawDeviceProvider::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_list_devices()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![entry(1, RawDeviceKind::Keyboard)]));
        mock.expect_list_devices()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![entry(2, RawDeviceKind::Keyboard)]));
        mock.expect_device_name()
            .returning(|_| Some(KBD_PATH.to_string()));
        mock.expect_friendly_name().returning(|_| None);
        let (catalog, _) = catalog(mock);

        // Act
        catalog.enumerate();
        catalog.enumerate();

        // Assert
        assert!(catalog.find(DeviceHandle(1)).is_none());
        assert!(catalog.find(DeviceHandle(2)).is_some());
        assert_eq!(catalog.last_pass().len(), 1);
    }

    // ── matching_keywords ─────────────────────────────────────────────────────

    fn identity(handle: u64, raw: &str, display: &str) -> DeviceIdentity {
        DeviceIdentity {
            handle: DeviceHandle(handle),
            raw_name: raw.to_string(),
            display_name: display.to_string(),
        }
    }

    #[test]
    fn test_keywords_match_case_insensitively_on_either_name() {
        let devices = vec![
            identity(1, r"\\?\ACPI#PNP0303#4&1", "keyboard device"),
            identity(2, r"\\?\HID#VID_05FE&PID_1010#7&2", "Card Reader"),
            identity(3, r"\\?\ACPI#PNP0303#4&2", "Bluetooth keyboard"),
        ];

        let hits = matching_keywords(&devices, "bluetooth; hid");

        let handles: Vec<u64> = hits.iter().map(|d| d.handle.value()).collect();
        assert_eq!(handles, vec![2, 3]);
    }

    #[test]
    fn test_blank_keywords_match_nothing() {
        let devices = vec![identity(1, r"\\?\HID#x", "HID keyboard")];
        assert!(matching_keywords(&devices, "").is_empty());
        assert!(matching_keywords(&devices, " ; ;").is_empty());
    }
}
