//! DeviceSelector: binds the decoder to exactly one device, or unbinds it.
//!
//! Binding is a pure identity assignment.  The handle is not checked against
//! the catalog; if the device later disappears, its events simply stop
//! arriving and the decoder stays bound to a silent handle until the user
//! picks another device.

use cardreader_core::DeviceHandle;

use super::decode_keystrokes::KeystrokeDecoder;

/// Use case for choosing which device the decoder listens to.
///
/// The bound handle and its display name live in the decoder's state and
/// always change together.
pub struct DeviceSelector {
    decoder: KeystrokeDecoder,
}

impl DeviceSelector {
    pub fn new(decoder: KeystrokeDecoder) -> Self {
        Self { decoder }
    }

    /// Restricts the decoder to events from `handle`.
    ///
    /// Clears any partially typed input and cancels the pending timeout so
    /// digits from the previous device cannot leak into the new session.
    /// Returns `false` only after the decoder has been shut down.
    pub fn bind(&self, handle: DeviceHandle, display_name: impl Into<String>) -> bool {
        self.decoder.rebind(Some((handle, display_name.into())))
    }

    /// Accepts events from any device again.
    ///
    /// The pending timeout is cancelled before this returns.
    pub fn unbind(&self) {
        self.decoder.rebind(None);
    }

    pub fn is_bound(&self) -> bool {
        self.decoder.bound_handle().is_some()
    }

    pub fn bound_handle(&self) -> Option<DeviceHandle> {
        self.decoder.bound_handle()
    }

    /// Display name passed to the last successful [`bind`](Self::bind).
    pub fn current_device_name(&self) -> Option<String> {
        self.binding().map(|(_, name)| name)
    }

    /// Handle and display name of the bound device, read in one snapshot.
    pub fn binding(&self) -> Option<(DeviceHandle, String)> {
        self.decoder.binding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use cardreader_core::{DecoderConfig, Diagnostic, KeyEvent};

    use crate::application::event_sink::EventSink;
    use crate::infrastructure::timer::mock::ManualTimeoutScheduler;

    fn selector() -> (DeviceSelector, KeystrokeDecoder, Arc<EventSink>) {
        let sink = Arc::new(EventSink::new());
        let decoder = KeystrokeDecoder::new(
            DecoderConfig::default(),
            Duration::from_millis(500),
            Arc::new(ManualTimeoutScheduler::new()),
            Arc::clone(&sink),
        );
        (DeviceSelector::new(decoder.clone()), decoder, sink)
    }

    #[test]
    fn test_starts_unbound() {
        let (sel, _, _) = selector();
        assert!(!sel.is_bound());
        assert_eq!(sel.bound_handle(), None);
        assert_eq!(sel.current_device_name(), None);
    }

    #[test]
    fn test_bind_sets_handle_and_name() {
        // Arrange
        let (sel, _, sink) = selector();
        let mut logs = sink.subscribe_logs();

        // Act
        let ok = sel.bind(DeviceHandle(0x2A), "USB keyboard");

        // Assert
        assert!(ok);
        assert!(sel.is_bound());
        assert_eq!(sel.bound_handle(), Some(DeviceHandle(0x2A)));
        assert_eq!(sel.current_device_name().as_deref(), Some("USB keyboard"));
        assert_eq!(
            logs.try_recv().unwrap().0,
            Diagnostic::DeviceBound {
                handle: DeviceHandle(0x2A),
                display_name: "USB keyboard".into()
            }
        );
    }

    #[test]
    fn test_bind_never_validates_handle() {
        let (sel, _, _) = selector();
        assert!(sel.bind(DeviceHandle(u64::MAX), "ghost"));
    }

    #[test]
    fn test_bind_discards_previous_device_digits() {
        // Arrange
        let (sel, decoder, _) = selector();
        sel.bind(DeviceHandle(1), "first");
        decoder.handle_key(KeyEvent::pressed(DeviceHandle(1), 0x31));
        decoder.handle_key(KeyEvent::pressed(DeviceHandle(1), 0x32));

        // Act
        sel.bind(DeviceHandle(2), "second");

        // Assert
        assert_eq!(decoder.buffered_len(), 0);
        assert!(!decoder.is_timeout_armed());
    }

    #[test]
    fn test_unbind_clears_handle_name_and_timeout() {
        let (sel, decoder, sink) = selector();
        sel.bind(DeviceHandle(1), "reader");
        decoder.handle_key(KeyEvent::pressed(DeviceHandle(1), 0x31));
        let mut logs = sink.subscribe_logs();

        sel.unbind();

        assert!(!sel.is_bound());
        assert_eq!(sel.current_device_name(), None);
        assert!(!decoder.is_timeout_armed());
        assert_eq!(logs.try_recv().unwrap().0, Diagnostic::DeviceUnbound);
    }

    #[test]
    fn test_rebinding_replaces_handle_and_name_as_a_pair() {
        // Arrange
        let (sel, _, _) = selector();
        sel.bind(DeviceHandle(1), "first");

        // Act
        sel.bind(DeviceHandle(2), "second");

        // Assert
        assert_eq!(sel.binding(), Some((DeviceHandle(2), "second".to_string())));
        sel.unbind();
        assert_eq!(sel.binding(), None);
    }

    #[test]
    fn test_bind_fails_after_shutdown() {
        let (sel, decoder, _) = selector();
        decoder.shutdown();

        assert!(!sel.bind(DeviceHandle(1), "reader"));
        assert!(!sel.is_bound());
        assert_eq!(sel.current_device_name(), None);
    }
}
