//! Timer infrastructure for the decoder's inactivity timeout.
//!
//! The production implementation spawns one Tokio task per armed timeout:
//! the task sleeps for the delay and then runs the expiry callback.
//! Cancelling aborts the task.
//!
//! # Testability
//!
//! The [`TimeoutScheduler`] trait lets tests swap in
//! [`mock::ManualTimeoutScheduler`], whose clock only moves when the test
//! calls `advance`.

use std::time::Duration;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::JoinHandle;

use crate::application::decode_keystrokes::{ScheduledTimeout, TimeoutScheduler};

pub mod mock;

/// Schedules expiry callbacks on a Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioTimeoutScheduler {
    handle: Handle,
}

impl TokioTimeoutScheduler {
    /// Creates a scheduler that spawns onto `handle`.
    ///
    /// The handle may be used from any thread, including the OS input thread,
    /// which is not a runtime worker.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Creates a scheduler for the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns [`TryCurrentError`] when called outside a Tokio runtime.
    pub fn try_current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

/// A pending Tokio sleep task.
struct TokioTimeout(JoinHandle<()>);

impl ScheduledTimeout for TokioTimeout {
    fn cancel(&self) {
        self.0.abort();
    }
}

impl TimeoutScheduler for TokioTimeoutScheduler {
    fn schedule(
        &self,
        delay: Duration,
        on_expiry: Box<dyn FnOnce() + Send>,
    ) -> Box<dyn ScheduledTimeout> {
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            on_expiry();
        });
        Box::new(TokioTimeout(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_callback_runs_after_delay() {
        // Arrange
        let scheduler = TokioTimeoutScheduler::try_current().expect("inside runtime");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let start = Instant::now();

        // Act
        let _pending = scheduler.schedule(
            Duration::from_millis(500),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        rx.recv().await.expect("callback fired");

        // Assert
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_callback_never_runs() {
        // Arrange
        let scheduler = TokioTimeoutScheduler::try_current().expect("inside runtime");
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        // Act
        let pending = scheduler.schedule(
            Duration::from_millis(500),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        pending.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;

        // Assert
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decoder_timeout_clears_partial_number_on_tokio_timer() {
        use crate::application::decode_keystrokes::KeystrokeDecoder;
        use crate::application::event_sink::EventSink;
        use cardreader_core::{DecoderConfig, DeviceHandle, Diagnostic, KeyEvent};

        // Arrange
        let sink = Arc::new(EventSink::new());
        let mut logs = sink.subscribe_logs();
        let decoder = KeystrokeDecoder::new(
            DecoderConfig::default(),
            Duration::from_millis(500),
            Arc::new(TokioTimeoutScheduler::try_current().expect("inside runtime")),
            sink,
        );
        let reader = DeviceHandle(0x51);

        // Act: two digits, a pause shorter than the timeout, one more digit
        decoder.handle_key(KeyEvent::pressed(reader, 0x31));
        decoder.handle_key(KeyEvent::pressed(reader, 0x32));
        tokio::time::sleep(Duration::from_millis(400)).await;
        decoder.handle_key(KeyEvent::pressed(reader, 0x33));
        tokio::time::sleep(Duration::from_millis(400)).await;

        // Assert: the third digit re-armed the timer
        assert_eq!(decoder.buffered_len(), 3);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let cleared = loop {
            let event = logs.recv().await.expect("log channel open");
            if let Diagnostic::TimeoutCleared { buffered } = event.0 {
                break buffered;
            }
        };
        assert_eq!(cleared, 3);
        assert_eq!(decoder.buffered_len(), 0);
        assert!(!decoder.is_timeout_armed());
    }

    #[test]
    fn test_try_current_fails_outside_runtime() {
        assert!(TokioTimeoutScheduler::try_current().is_err());
    }
}
