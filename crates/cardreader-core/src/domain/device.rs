//! Device identity entity and display-name derivation.
//!
//! Every keyboard-class input source the OS reports is described by a
//! [`DeviceIdentity`].  Only the [`DeviceHandle`] takes part in identity
//! comparison; the two name fields exist for diagnostics and for the UI.
//!
//! # Where do display names come from?
//!
//! The OS only gives us a device interface path such as
//!
//! ```text
//! \\?\HID#VID_1A2C&PID_6004&MI_00#7&1234abcd&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}
//! ```
//!
//! [`derive_display_name`] turns that into something a person can pick from a
//! list, preferring a friendly name looked up from the device registry and
//! falling back to a heuristic built from the vendor/product ids and the bus
//! keyword embedded in the path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix the OS puts in front of every device interface path.
const VOLUME_PATH_PREFIX: &str = r"\\?\";

/// Marker that starts the interface-class GUID suffix of a device path.
const GUID_SUFFIX_MARKER: &str = "#{";

/// Label used when nothing at all can be derived from the device path.
pub const UNKNOWN_DEVICE_NAME: &str = "unknown device";

/// Opaque OS-assigned device handle.
///
/// The value is a foreign resource reference: it is only ever compared for
/// equality and is never dereferenced.  A handle is meaningful only within the
/// enumeration pass (and device connection) that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle(pub u64);

impl DeviceHandle {
    /// Returns the raw handle value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Error returned when a persisted handle string cannot be parsed.
#[derive(Debug, Error, PartialEq)]
#[error("invalid device handle: {0:?}")]
pub struct ParseHandleError(pub String);

impl FromStr for DeviceHandle {
    type Err = ParseHandleError;

    /// Parses `0x`-prefixed hexadecimal (as produced by `Display`) or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed
            .map(DeviceHandle)
            .map_err(|_| ParseHandleError(s.to_string()))
    }
}

/// One physical or logical keyboard-class input source.
///
/// Immutable once constructed by a catalog enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Opaque OS handle; the only field used for identity comparison.
    pub handle: DeviceHandle,
    /// OS device interface path.
    pub raw_name: String,
    /// Human-friendly label; presentational only.
    pub display_name: String,
}

impl DeviceIdentity {
    /// Builds an identity, deriving the display name from `raw_name`.
    ///
    /// `lookup` receives the device-instance path (see [`instance_path`]) and
    /// returns the registry friendly name, if any.
    pub fn new<F>(handle: DeviceHandle, raw_name: impl Into<String>, lookup: F) -> Self
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let raw_name = raw_name.into();
        let display_name = derive_display_name(&raw_name, lookup);
        Self {
            handle,
            raw_name,
            display_name,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.display_name, self.handle)
    }
}

/// Connection type inferred from keywords in a device path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Bluetooth,
    Usb,
    Hid,
    Generic,
}

impl ConnectionKind {
    /// Classifies a device path by keyword search.
    ///
    /// `Bluetooth` is matched case-sensitively, `bth` case-insensitively,
    /// then `USB`, then `HID`.
    pub fn classify(raw_name: &str) -> Self {
        if raw_name.contains("Bluetooth") || raw_name.to_ascii_lowercase().contains("bth") {
            ConnectionKind::Bluetooth
        } else if raw_name.contains("USB") {
            ConnectionKind::Usb
        } else if raw_name.contains("HID") {
            ConnectionKind::Hid
        } else {
            ConnectionKind::Generic
        }
    }

    /// Human-readable label used in display names.
    pub fn label(self) -> &'static str {
        match self {
            ConnectionKind::Bluetooth => "Bluetooth keyboard",
            ConnectionKind::Usb => "USB keyboard",
            ConnectionKind::Hid => "HID keyboard",
            ConnectionKind::Generic => "keyboard device",
        }
    }
}

/// Derives the device-instance path used as the registry lookup key.
///
/// `\\?\HID#VID_1A2C&PID_6004#7&1234abcd&0&0000#{guid}` becomes
/// `HID\VID_1A2C&PID_6004\7&1234abcd&0&0000`.
///
/// Returns `None` when `raw_name` does not start with the volume-path prefix.
pub fn instance_path(raw_name: &str) -> Option<String> {
    let mut path = raw_name.strip_prefix(VOLUME_PATH_PREFIX)?;
    if let Some(idx) = path.rfind(GUID_SUFFIX_MARKER) {
        if idx > 0 {
            path = &path[..idx];
        }
    }
    Some(path.replace('#', "\\"))
}

/// Extracts the four hex digits following `marker` (e.g. `VID_`), if present.
pub fn extract_hex_id(raw_name: &str, marker: &str) -> Option<String> {
    let start = raw_name.find(marker)? + marker.len();
    let candidate = raw_name.get(start..start + 4)?;
    candidate
        .chars()
        .all(|c| c.is_ascii_hexdigit())
        .then(|| candidate.to_string())
}

/// Builds the heuristic display name from the ids and bus keyword in a path.
pub fn heuristic_display_name(raw_name: &str) -> String {
    let kind = ConnectionKind::classify(raw_name).label();
    match (
        extract_hex_id(raw_name, "VID_"),
        extract_hex_id(raw_name, "PID_"),
    ) {
        (Some(vid), Some(pid)) => format!("{kind} (VID:{vid} PID:{pid})"),
        _ => kind.to_string(),
    }
}

/// Removes the localisation prefix (`@oem.inf,%desc%;`) from a registry description.
fn strip_localization_prefix(name: &str) -> &str {
    match name.rfind(';') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Derives a human-friendly display name for a device path.
///
/// Order of preference:
/// 1. The friendly name returned by `lookup` for the [`instance_path`],
///    with any `;`-delimited prefix removed, when non-empty.
/// 2. [`heuristic_display_name`].
/// 3. [`UNKNOWN_DEVICE_NAME`] when `raw_name` is empty.
pub fn derive_display_name<F>(raw_name: &str, lookup: F) -> String
where
    F: FnOnce(&str) -> Option<String>,
{
    if raw_name.is_empty() {
        return UNKNOWN_DEVICE_NAME.to_string();
    }

    if let Some(friendly) = instance_path(raw_name).and_then(|path| lookup(&path)) {
        let friendly = strip_localization_prefix(&friendly).trim();
        if !friendly.is_empty() {
            return friendly.to_string();
        }
    }

    heuristic_display_name(raw_name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
