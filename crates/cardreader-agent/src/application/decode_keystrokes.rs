//! KeystrokeDecoder: turns a bound device's key presses into card numbers.
//!
//! A card reader that emulates a keyboard types each card number as a burst
//! of digit key presses, optionally followed by Enter.  The decoder filters
//! the shared keyboard event stream down to the bound device, accumulates
//! digits, decides when a card number is complete, and publishes the result
//! through the [`EventSink`].
//!
//! # States
//!
//! ```text
//!            digit                       digit (len < card_length)
//!   Idle ───────────────► Accumulating ◄──────────────────────┐
//!    ▲                        │  │                            │
//!    │   finalize / timeout   │  └────────────────────────────┘
//!    └────────────────────────┘
//! ```
//!
//! - **Idle**: the buffer is empty and no timeout is armed.
//! - **Accumulating**: the buffer holds digits and the inactivity timeout
//!   is armed.  Every digit re-arms it, and so does an Enter that is not
//!   required as a terminator.
//!
//! Completion happens either by length (no terminator required) or by the
//! terminator key.  A burst that stalls for longer than the timeout is
//! discarded so that a half-read card cannot merge with the next one.
//!
//! # Concurrency
//!
//! Buffer, bound handle, configuration, and the armed timeout live together
//! behind one `Mutex`.  Events are published while the lock is held so
//! listeners observe them in decision order.  Each armed timeout carries a
//! generation number; an expiry whose generation is no longer current is
//! ignored, which makes a timeout racing a finalize, bind, or unbind harmless.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use cardreader_core::{
    CardNumber, DecoderConfig, DeviceHandle, Diagnostic, KeyClass, KeyEvent, StaleBufferPolicy,
};
use tracing::debug;

use super::event_sink::{CardNumberEvent, EventSink};

// ── Timer seam ────────────────────────────────────────────────────────────────

/// A scheduled callback that can be cancelled before it fires.
pub trait ScheduledTimeout: Send {
    /// Prevents the callback from running if it has not started yet.
    fn cancel(&self);
}

/// Schedules single-shot deferred callbacks.
///
/// The production implementation uses Tokio; tests use a virtual clock.
pub trait TimeoutScheduler: Send + Sync {
    /// Runs `on_expiry` once after `delay` unless cancelled first.
    fn schedule(
        &self,
        delay: Duration,
        on_expiry: Box<dyn FnOnce() + Send>,
    ) -> Box<dyn ScheduledTimeout>;
}

// ── Decoder state ─────────────────────────────────────────────────────────────

/// Observable decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Idle,
    Accumulating,
}

struct ArmedTimeout {
    generation: u64,
    handle: Box<dyn ScheduledTimeout>,
}

struct DecoderCore {
    config: DecoderConfig,
    bound: Option<DeviceHandle>,
    /// Display name of `bound`; always changes together with it.
    bound_name: Option<String>,
    buffer: String,
    armed: Option<ArmedTimeout>,
    next_generation: u64,
    shut_down: bool,
}

impl DecoderCore {
    fn cancel_timeout(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.cancel();
        }
    }
}

struct DecoderInner {
    core: Mutex<DecoderCore>,
    scheduler: Arc<dyn TimeoutScheduler>,
    sink: Arc<EventSink>,
    timeout: Duration,
}

/// The keystroke decoder.  Cheap to clone; clones share state.
#[derive(Clone)]
pub struct KeystrokeDecoder {
    inner: Arc<DecoderInner>,
}

impl KeystrokeDecoder {
    /// Creates an unbound decoder in the `Idle` state.
    pub fn new(
        config: DecoderConfig,
        timeout: Duration,
        scheduler: Arc<dyn TimeoutScheduler>,
        sink: Arc<EventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(DecoderInner {
                core: Mutex::new(DecoderCore {
                    config,
                    bound: None,
                    bound_name: None,
                    buffer: String::new(),
                    armed: None,
                    next_generation: 0,
                    shut_down: false,
                }),
                scheduler,
                sink,
                timeout,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DecoderCore> {
        self.inner
            .core
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Event processing ──────────────────────────────────────────────────────

    /// Processes one keyboard event.
    ///
    /// Releases, events from a device other than the bound one, and keys that
    /// are neither digits nor the terminator are ignored without a trace.
    pub fn handle_key(&self, event: KeyEvent) {
        if !event.is_press() {
            return;
        }

        let mut core = self.lock();
        if core.shut_down {
            return;
        }
        if core.bound.is_some_and(|bound| bound != event.device) {
            return;
        }

        let config = core.config;
        match event.class() {
            class @ KeyClass::Digit(_) => {
                let Some(digit) = class.digit_char() else {
                    return;
                };
                core.buffer.push(digit);
                self.inner.sink.publish_log(Diagnostic::DigitReceived {
                    digit,
                    buffered: core.buffer.len(),
                });
                self.arm_timeout(&mut core);

                if !config.require_terminator() && core.buffer.len() >= config.card_length() {
                    core.cancel_timeout();
                    self.finalize(&mut core, config);
                }
            }
            KeyClass::Terminator => {
                if config.require_terminator() {
                    core.cancel_timeout();
                    self.finalize(&mut core, config);
                } else if !core.buffer.is_empty() {
                    // Not a completion signal, but still activity.
                    self.arm_timeout(&mut core);
                }
            }
            KeyClass::Other => {}
        }
    }

    /// Drains the buffer and publishes the verdict.
    fn finalize(&self, core: &mut DecoderCore, config: DecoderConfig) {
        let input = std::mem::take(&mut core.buffer);
        if input.is_empty() {
            return;
        }

        let sink = &self.inner.sink;
        sink.publish_log(Diagnostic::InputReceived {
            input: input.clone(),
        });

        match CardNumber::parse(&input, config.card_length()) {
            Ok(card_number) => {
                sink.publish_log(Diagnostic::CardAccepted {
                    card_number: card_number.to_string(),
                });
                sink.publish_card_number(CardNumberEvent {
                    card_number,
                    device: core.bound,
                });
            }
            Err(err) => {
                debug!("rejected input: {err}");
                sink.publish_log(Diagnostic::InvalidInput {
                    input,
                    expected_len: config.card_length(),
                });
            }
        }
    }

    // ── Timeout ───────────────────────────────────────────────────────────────

    fn arm_timeout(&self, core: &mut DecoderCore) {
        core.cancel_timeout();

        let generation = core.next_generation;
        core.next_generation = core.next_generation.wrapping_add(1);

        let weak: Weak<DecoderInner> = Arc::downgrade(&self.inner);
        let handle = self.inner.scheduler.schedule(
            self.inner.timeout,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    KeystrokeDecoder { inner }.on_timeout(generation);
                }
            }),
        );
        core.armed = Some(ArmedTimeout { generation, handle });
    }

    /// Handles expiry of the timeout armed with `generation`.
    ///
    /// Stale generations (the timeout was re-armed or cancelled after this
    /// callback was scheduled) are ignored.
    ///
    /// A buffer that already holds `card_length` digits is cleared under the
    /// default [`StaleBufferPolicy::ClearAll`], so a reader that never sends
    /// the required Enter cannot leave a number pending indefinitely.
    /// [`StaleBufferPolicy::KeepComplete`] keeps it for a late terminator.
    fn on_timeout(&self, generation: u64) {
        let mut core = self.lock();
        if core.shut_down {
            return;
        }
        match core.armed.as_ref() {
            Some(armed) if armed.generation == generation => {}
            _ => return,
        }
        core.armed = None;

        let buffered = core.buffer.len();
        if buffered == 0 {
            return;
        }
        if buffered == core.config.card_length()
            && core.config.stale_buffer() == StaleBufferPolicy::KeepComplete
        {
            return;
        }

        core.buffer.clear();
        self.inner
            .sink
            .publish_log(Diagnostic::TimeoutCleared { buffered });
    }

    // ── Control ───────────────────────────────────────────────────────────────

    /// Replaces the bound device and its display name, clearing the buffer
    /// and cancelling the timeout.  `None` unbinds.
    ///
    /// Handle, name, and the `DeviceBound`/`DeviceUnbound` announcement all
    /// change inside one critical section.  Returns `false` only after
    /// [`shutdown`](Self::shutdown).
    pub(crate) fn rebind(&self, binding: Option<(DeviceHandle, String)>) -> bool {
        let mut core = self.lock();
        if core.shut_down {
            return false;
        }
        core.cancel_timeout();
        core.buffer.clear();

        let announcement = match &binding {
            Some((handle, display_name)) => Diagnostic::DeviceBound {
                handle: *handle,
                display_name: display_name.clone(),
            },
            None => Diagnostic::DeviceUnbound,
        };
        let (handle, name) = binding.unzip();
        core.bound = handle;
        core.bound_name = name;
        self.inner.sink.publish_log(announcement);
        true
    }

    /// Applies a new configuration to subsequent events.
    ///
    /// Digits already buffered are kept; they are judged against the new
    /// configuration when the next digit or terminator arrives.
    pub fn set_config(&self, config: DecoderConfig) {
        let mut core = self.lock();
        if core.shut_down {
            return;
        }
        core.config = config;
        self.inner.sink.publish_log(Diagnostic::ConfigUpdated {
            card_length: config.card_length(),
            require_terminator: config.require_terminator(),
        });
    }

    /// Stops the decoder.  Every later call is a no-op.
    ///
    /// Waits for any in-flight event to finish, cancels the timeout, and
    /// discards the buffer.
    pub fn shutdown(&self) {
        let mut core = self.lock();
        if core.shut_down {
            return;
        }
        core.cancel_timeout();
        core.buffer.clear();
        core.shut_down = true;
        self.inner.sink.publish_log(Diagnostic::Stopped);
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn state(&self) -> DecoderState {
        if self.lock().buffer.is_empty() {
            DecoderState::Idle
        } else {
            DecoderState::Accumulating
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn is_timeout_armed(&self) -> bool {
        self.lock().armed.is_some()
    }

    pub fn bound_handle(&self) -> Option<DeviceHandle> {
        self.lock().bound
    }

    /// The bound handle and its display name, read together.
    pub fn binding(&self) -> Option<(DeviceHandle, String)> {
        let core = self.lock();
        core.bound.zip(core.bound_name.clone())
    }

    pub fn config(&self) -> DecoderConfig {
        self.lock().config
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
