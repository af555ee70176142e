//! CardReaderService: the facade the UI and the binary talk to.
//!
//! Wires the catalog, selector, decoder, and event sink together and adds
//! the entry points that depend on the OS layer: raw payload intake,
//! background-input registration, and restoring a persisted binding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cardreader_core::domain::device::UNKNOWN_DEVICE_NAME;
use cardreader_core::raw_input::codec::{decode_key_event, RawInputLayout};
use cardreader_core::{DecoderConfig, DecoderConfigError, DeviceHandle, DeviceIdentity, Diagnostic};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use super::decode_keystrokes::{KeystrokeDecoder, TimeoutScheduler};
use super::device_catalog::{DeviceCatalog, RawDeviceProvider};
use super::event_sink::{CardNumberEvent, EventSink, LogEvent};
use super::select_device::DeviceSelector;
use crate::infrastructure::raw_input::{RawInputRegistrar, WindowTarget};
use crate::infrastructure::storage::config::DeviceConfig;

/// Entry point for everything outside the application layer.
pub struct CardReaderService {
    sink: Arc<EventSink>,
    decoder: KeystrokeDecoder,
    selector: DeviceSelector,
    catalog: DeviceCatalog,
    layout: RawInputLayout,
    degraded: AtomicBool,
}

impl CardReaderService {
    /// Creates an unbound service.
    ///
    /// `timeout` is the inactivity window after which a partial card number
    /// is discarded.
    pub fn new(
        config: DecoderConfig,
        timeout: Duration,
        provider: Arc<dyn RawDeviceProvider>,
        scheduler: Arc<dyn TimeoutScheduler>,
    ) -> Self {
        let sink = Arc::new(EventSink::new());
        let decoder = KeystrokeDecoder::new(config, timeout, scheduler, Arc::clone(&sink));
        Self {
            selector: DeviceSelector::new(decoder.clone()),
            catalog: DeviceCatalog::new(provider, Arc::clone(&sink)),
            decoder,
            sink,
            layout: RawInputLayout::NATIVE,
            degraded: AtomicBool::new(false),
        }
    }

    /// Overrides the pointer width used to decode raw payloads.
    pub fn with_layout(mut self, layout: RawInputLayout) -> Self {
        self.layout = layout;
        self
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    /// Sets card length and terminator requirement, keeping the stale-buffer policy.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderConfigError::ZeroCardLength`] when `card_length` is 0;
    /// the current configuration is left unchanged.
    pub fn configure(
        &self,
        card_length: usize,
        require_terminator: bool,
    ) -> Result<(), DecoderConfigError> {
        let policy = self.decoder.config().stale_buffer();
        let config = DecoderConfig::new(card_length, require_terminator)?.with_stale_buffer(policy);
        self.decoder.set_config(config);
        Ok(())
    }

    /// Replaces the whole decoder configuration.
    pub fn apply_config(&self, config: DecoderConfig) {
        self.decoder.set_config(config);
    }

    pub fn config(&self) -> DecoderConfig {
        self.decoder.config()
    }

    // ── Devices ───────────────────────────────────────────────────────────────

    /// Enumerates keyboard-class devices the user can bind to.
    pub fn get_available_devices(&self) -> Vec<DeviceIdentity> {
        self.catalog.enumerate()
    }

    pub fn catalog(&self) -> &DeviceCatalog {
        &self.catalog
    }

    pub fn bind(&self, handle: DeviceHandle, display_name: impl Into<String>) -> bool {
        self.selector.bind(handle, display_name)
    }

    pub fn unbind(&self) {
        self.selector.unbind();
    }

    pub fn bound_handle(&self) -> Option<DeviceHandle> {
        self.selector.bound_handle()
    }

    pub fn current_device_name(&self) -> Option<String> {
        self.selector.current_device_name()
    }

    /// `true` while the decoder is bound to a reader and running.
    pub fn is_listening(&self) -> bool {
        self.selector.is_bound() && !self.decoder.is_shut_down()
    }

    /// Replays a persisted binding.
    ///
    /// A handle that no longer exists still binds; the decoder simply
    /// receives nothing until the user selects another device.  An
    /// unparseable handle is skipped with a warning.  Returns whether a
    /// binding was made.
    pub fn restore_binding(&self, stored: &DeviceConfig) -> bool {
        let Some(raw) = stored.last_device_handle.as_deref() else {
            return false;
        };
        let handle = match raw.parse::<DeviceHandle>() {
            Ok(handle) => handle,
            Err(err) => {
                warn!("not restoring device binding: {err}");
                return false;
            }
        };

        let name = self
            .catalog
            .find(handle)
            .map(|d| d.display_name)
            .or_else(|| stored.last_device_name.clone())
            .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string());
        self.bind(handle, name)
    }

    /// The current binding in its persisted form.
    pub fn current_binding(&self) -> DeviceConfig {
        let (handle, name) = self.selector.binding().unzip();
        DeviceConfig {
            last_device_handle: handle.map(|h| h.to_string()),
            last_device_name: name,
        }
    }

    // ── Raw input ─────────────────────────────────────────────────────────────

    /// Feeds one `WM_INPUT` payload to the decoder.
    ///
    /// Non-keyboard records are dropped silently.  Malformed payloads are
    /// dropped with a `MalformedEvent` diagnostic.
    pub fn process_raw_event(&self, payload: &[u8]) {
        match decode_key_event(payload, self.layout) {
            Ok(Some(event)) => self.decoder.handle_key(event),
            Ok(None) => {}
            Err(err) => self.sink.publish_log(Diagnostic::MalformedEvent {
                reason: err.to_string(),
            }),
        }
    }

    /// Requests background keyboard delivery to `target`.
    ///
    /// Failure is not fatal: the service enters degraded mode (input only
    /// arrives while the window has focus, if at all) until a later call
    /// succeeds.
    pub fn register_raw_input(&self, registrar: &dyn RawInputRegistrar, target: WindowTarget) -> bool {
        match registrar.register_keyboard_sink(target) {
            Ok(()) => {
                self.degraded.store(false, Ordering::SeqCst);
                self.sink.publish_log(Diagnostic::RegistrationSucceeded);
                true
            }
            Err(err) => {
                self.degraded.store(true, Ordering::SeqCst);
                self.sink.publish_log(Diagnostic::RegistrationFailed {
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    // ── Events / lifecycle ────────────────────────────────────────────────────

    pub fn subscribe_card_numbers(&self) -> UnboundedReceiver<CardNumberEvent> {
        self.sink.subscribe_card_numbers()
    }

    pub fn subscribe_logs(&self) -> UnboundedReceiver<LogEvent> {
        self.sink.subscribe_logs()
    }

    pub fn decoder(&self) -> &KeystrokeDecoder {
        &self.decoder
    }

    /// Stops the decoder; later events, binds, and timeouts are ignored.
    pub fn shutdown(&self) {
        self.decoder.shutdown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
