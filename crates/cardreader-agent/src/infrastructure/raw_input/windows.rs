//! Windows Raw Input implementation.
//!
//! Device discovery uses `GetRawInputDeviceList` / `GetRawInputDeviceInfoW`,
//! friendly names come from the `DeviceDesc` value under
//! `HKLM\SYSTEM\CurrentControlSet\Enum\<instance path>`, and keystrokes arrive
//! as `WM_INPUT` messages on a hidden message-only window that runs its own
//! Win32 message loop thread.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::ffi::c_void;
use std::sync::{Arc, OnceLock};

use cardreader_core::DeviceHandle;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HANDLE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Registry::{RegGetValueW, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ};
use windows::Win32::UI::Input::{
    GetRawInputData, GetRawInputDeviceInfoW, GetRawInputDeviceList, RegisterRawInputDevices,
    HRAWINPUT, RAWINPUTDEVICE, RAWINPUTDEVICELIST, RAWINPUTHEADER, RIDEV_INPUTSINK,
    RIDI_DEVICENAME, RID_INPUT, RIM_TYPEKEYBOARD, RIM_TYPEMOUSE,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW, RegisterClassW,
    TranslateMessage, HWND_MESSAGE, MSG, WINDOW_EX_STYLE, WINDOW_STYLE, WM_INPUT, WNDCLASSW,
};

use super::{
    RawInputRegistrar, RegistrationError, WindowTarget, HID_USAGE_GENERIC_KEYBOARD,
    HID_USAGE_PAGE_GENERIC,
};
use crate::application::device_catalog::{
    CatalogError, RawDeviceEntry, RawDeviceKind, RawDeviceProvider,
};
use crate::application::reader_service::CardReaderService;

/// Registry key under which every device instance lives.
const ENUM_KEY_PREFIX: &str = r"SYSTEM\CurrentControlSet\Enum\";

/// Service that receives `WM_INPUT` payloads.
/// Initialized once by [`run_message_loop`].
static SERVICE: OnceLock<Arc<CardReaderService>> = OnceLock::new();

/// The Windows Raw Input API as a device provider and registrar.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRawInput;

impl WindowsRawInput {
    pub fn new() -> Self {
        Self
    }
}

impl RawDeviceProvider for WindowsRawInput {
    fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, CatalogError> {
        let entry_size = std::mem::size_of::<RAWINPUTDEVICELIST>() as u32;
        let mut count = 0u32;

        // SAFETY: a null list pointer asks only for the device count.
        let rc = unsafe { GetRawInputDeviceList(None, &mut count, entry_size) };
        if rc == u32::MAX {
            return Err(CatalogError::ListFailed(last_os_error()));
        }

        let mut list = vec![RAWINPUTDEVICELIST::default(); count as usize];
        // SAFETY: `list` holds `count` entries of the size we pass.
        let filled = unsafe { GetRawInputDeviceList(Some(list.as_mut_ptr()), &mut count, entry_size) };
        if filled == u32::MAX {
            return Err(CatalogError::ListFailed(last_os_error()));
        }
        list.truncate(filled as usize);

        Ok(list
            .into_iter()
            .map(|entry| RawDeviceEntry {
                handle: DeviceHandle(entry.hDevice.0 as usize as u64),
                kind: match entry.dwType {
                    RIM_TYPEKEYBOARD => RawDeviceKind::Keyboard,
                    RIM_TYPEMOUSE => RawDeviceKind::Mouse,
                    _ => RawDeviceKind::Hid,
                },
            })
            .collect())
    }

    fn device_name(&self, handle: DeviceHandle) -> Option<String> {
        let device = HANDLE(handle.value() as usize as *mut c_void);
        let mut chars = 0u32;

        // SAFETY: a null buffer asks for the name length in characters.
        let rc = unsafe { GetRawInputDeviceInfoW(Some(device), RIDI_DEVICENAME, None, &mut chars) };
        if rc == u32::MAX || chars == 0 {
            return None;
        }

        let mut buf = vec![0u16; chars as usize];
        // SAFETY: `buf` holds `chars` UTF-16 units, matching `chars`.
        let copied = unsafe {
            GetRawInputDeviceInfoW(
                Some(device),
                RIDI_DEVICENAME,
                Some(buf.as_mut_ptr().cast()),
                &mut chars,
            )
        };
        if copied == u32::MAX {
            return None;
        }
        Some(from_wide(&buf))
    }

    fn friendly_name(&self, instance_path: &str) -> Option<String> {
        let subkey = to_wide(&format!("{ENUM_KEY_PREFIX}{instance_path}"));
        let mut bytes = 0u32;

        // SAFETY: a null data pointer asks for the value size in bytes.
        let rc = unsafe {
            RegGetValueW(
                HKEY_LOCAL_MACHINE,
                PCWSTR(subkey.as_ptr()),
                w!("DeviceDesc"),
                RRF_RT_REG_SZ,
                None,
                None,
                Some(&mut bytes),
            )
        };
        if rc.is_err() || bytes == 0 {
            return None;
        }

        let mut buf = vec![0u16; (bytes as usize).div_ceil(2)];
        // SAFETY: `buf` is at least `bytes` long and `bytes` is passed back unchanged.
        let rc = unsafe {
            RegGetValueW(
                HKEY_LOCAL_MACHINE,
                PCWSTR(subkey.as_ptr()),
                w!("DeviceDesc"),
                RRF_RT_REG_SZ,
                None,
                Some(buf.as_mut_ptr().cast()),
                Some(&mut bytes),
            )
        };
        if rc.is_err() {
            return None;
        }
        Some(from_wide(&buf))
    }
}

impl RawInputRegistrar for WindowsRawInput {
    fn register_keyboard_sink(&self, target: WindowTarget) -> Result<(), RegistrationError> {
        let device = RAWINPUTDEVICE {
            usUsagePage: HID_USAGE_PAGE_GENERIC,
            usUsage: HID_USAGE_GENERIC_KEYBOARD,
            dwFlags: RIDEV_INPUTSINK,
            hwndTarget: HWND(target.0 as *mut c_void),
        };

        // SAFETY: one fully-initialized RAWINPUTDEVICE with its exact size.
        unsafe {
            RegisterRawInputDevices(&[device], std::mem::size_of::<RAWINPUTDEVICE>() as u32)
        }
        .map_err(|e| RegistrationError::Rejected(e.to_string()))
    }
}

// ── Message window ────────────────────────────────────────────────────────────

/// Creates the message-only window, registers it for background keyboard
/// input, and pumps messages until `WM_QUIT`.
///
/// Must run on a dedicated thread: the window belongs to the calling thread
/// and `WM_INPUT` is only delivered while this loop runs.  A registration
/// failure is reported through the service (degraded mode) and the loop still
/// runs.
///
/// # Errors
///
/// Returns [`RegistrationError::WindowCreation`] if a loop is already running
/// or the window cannot be created.
pub fn run_message_loop(service: Arc<CardReaderService>) -> Result<(), RegistrationError> {
    SERVICE.set(service).map_err(|_| {
        RegistrationError::WindowCreation(
            "raw input loop already initialized; only one may run".to_string(),
        )
    })?;
    let service = SERVICE
        .get()
        .ok_or_else(|| RegistrationError::WindowCreation("service not set".to_string()))?;

    let target = create_message_window()?;
    service.register_raw_input(&WindowsRawInput, target);

    let mut msg = MSG::default();
    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern on the
    // thread that owns the window.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    Ok(())
}

fn create_message_window() -> Result<WindowTarget, RegistrationError> {
    let class_name = w!("HidCardReaderRawInput");

    // SAFETY: `None` returns the handle of the current executable.
    let instance = unsafe { GetModuleHandleW(None) }
        .map_err(|e| RegistrationError::WindowCreation(e.to_string()))?;

    let class = WNDCLASSW {
        lpfnWndProc: Some(window_proc),
        hInstance: instance.into(),
        lpszClassName: class_name,
        ..Default::default()
    };
    // SAFETY: `class` outlives the call and names a static class string.
    if unsafe { RegisterClassW(&class) } == 0 {
        return Err(RegistrationError::WindowCreation(last_os_error()));
    }

    // SAFETY: the class was registered above; HWND_MESSAGE makes the window
    // invisible and excluded from broadcast messages.
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            class_name,
            w!("HID Card Reader"),
            WINDOW_STYLE::default(),
            0,
            0,
            0,
            0,
            Some(HWND_MESSAGE),
            None,
            Some(instance.into()),
            None,
        )
    }
    .map_err(|e| RegistrationError::WindowCreation(e.to_string()))?;

    Ok(WindowTarget(hwnd.0 as isize))
}

/// Window procedure for the message-only window.
///
/// # Safety
///
/// Called by Windows on the message loop thread.
unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if msg == WM_INPUT {
        let payload = read_raw_input(HRAWINPUT(l_param.0 as *mut c_void));
        if let Some(service) = SERVICE.get() {
            // An empty payload is reported as a malformed event.
            service.process_raw_event(&payload);
        }
    }
    // SAFETY: WM_INPUT must also reach DefWindowProcW so the system can free
    // the raw input buffer.
    DefWindowProcW(hwnd, msg, w_param, l_param)
}

/// Copies the `RAWINPUT` record behind `handle`; empty on failure.
fn read_raw_input(handle: HRAWINPUT) -> Vec<u8> {
    let header_size = std::mem::size_of::<RAWINPUTHEADER>() as u32;
    let mut size = 0u32;

    // SAFETY: a null buffer asks for the record size.
    let rc = unsafe { GetRawInputData(handle, RID_INPUT, None, &mut size, header_size) };
    if rc == u32::MAX || size == 0 {
        return Vec::new();
    }

    let mut buf = vec![0u8; size as usize];
    // SAFETY: `buf` holds exactly `size` bytes.
    let copied = unsafe {
        GetRawInputData(
            handle,
            RID_INPUT,
            Some(buf.as_mut_ptr().cast()),
            &mut size,
            header_size,
        )
    };
    if copied == u32::MAX {
        return Vec::new();
    }
    buf.truncate(copied as usize);
    buf
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

fn last_os_error() -> String {
    std::io::Error::last_os_error().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_string_round_trip_stops_at_nul() {
        let wide = to_wide("HID Keyboard Device");
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(from_wide(&wide), "HID Keyboard Device");
    }

    #[test]
    fn test_list_devices_reports_only_known_kinds() {
        // Every Windows host has at least the raw input list call available.
        let devices = WindowsRawInput::new().list_devices().expect("device list");
        assert!(devices
            .iter()
            .all(|d| matches!(d.kind, RawDeviceKind::Keyboard | RawDeviceKind::Mouse | RawDeviceKind::Hid)));
    }
}
