//! EventSink: fan-out publisher for card numbers and diagnostics.
//!
//! Two independent channels exist: one for validated card numbers and one
//! for [`Diagnostic`] log lines.  Any number of listeners may subscribe to
//! each; every listener receives every event in the order it was published.
//!
//! # Why unbounded channels? (for beginners)
//!
//! The decoder publishes while holding its state lock, on the OS input
//! thread.  It must never wait for a slow listener.  An unbounded
//! `tokio::sync::mpsc` sender's `send` is synchronous and never blocks, so a
//! listener that stops reading only grows its own queue; it cannot stall
//! the decoder or other listeners.  A listener that drops its receiver is
//! pruned on the next publish.

use std::sync::{Mutex, PoisonError};

use cardreader_core::{CardNumber, DeviceHandle, Diagnostic, DiagnosticLevel};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// A validated card number and the device that typed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardNumberEvent {
    pub card_number: CardNumber,
    /// The bound device at the time of acceptance; `None` when unbound.
    pub device: Option<DeviceHandle>,
}

/// A diagnostic published on the log channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent(pub Diagnostic);

impl LogEvent {
    /// Returns the human-readable log line.
    pub fn message(&self) -> String {
        self.0.to_string()
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        &self.0
    }
}

/// Fan-out publisher shared by the catalog, selector, and decoder.
#[derive(Default)]
pub struct EventSink {
    card_listeners: Mutex<Vec<UnboundedSender<CardNumberEvent>>>,
    log_listeners: Mutex<Vec<UnboundedSender<LogEvent>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new card-number listener.
    pub fn subscribe_card_numbers(&self) -> UnboundedReceiver<CardNumberEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.card_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Registers a new diagnostic listener.
    pub fn subscribe_logs(&self) -> UnboundedReceiver<LogEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.log_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Delivers `event` to every live card-number listener.
    pub fn publish_card_number(&self, event: CardNumberEvent) {
        let mut listeners = self
            .card_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Writes `diagnostic` to `tracing` and delivers it to every live log listener.
    pub fn publish_log(&self, diagnostic: Diagnostic) {
        match diagnostic.level() {
            DiagnosticLevel::Debug => debug!("{diagnostic}"),
            DiagnosticLevel::Info => info!("{diagnostic}"),
            DiagnosticLevel::Warn => warn!("{diagnostic}"),
        }

        let event = LogEvent(diagnostic);
        let mut listeners = self
            .log_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live card-number listeners (as of the last publish).
    pub fn card_listener_count(&self) -> usize {
        self.card_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
