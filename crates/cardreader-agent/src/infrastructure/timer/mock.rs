//! Manually driven timeout scheduler for unit testing.
//!
//! Time stands still until the test calls [`ManualTimeoutScheduler::advance`],
//! so timeout behaviour can be asserted without sleeping.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;

use crate::application::decode_keystrokes::{ScheduledTimeout, TimeoutScheduler};

struct PendingTimeout {
    due: Duration,
    cancelled: Arc<AtomicBool>,
    on_expiry: Box<dyn FnOnce() + Send>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    pending: Vec<PendingTimeout>,
}

/// A [`TimeoutScheduler`] with a virtual clock.
#[derive(Default, Clone)]
pub struct ManualTimeoutScheduler {
    clock: Arc<Mutex<Clock>>,
}

impl ManualTimeoutScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the virtual clock forward and runs every callback that became due.
    ///
    /// Callbacks run in due order after the internal lock is released, so a
    /// callback may schedule or cancel other timeouts.
    pub fn advance(&self, by: Duration) {
        let due = {
            let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
            clock.now += by;
            let now = clock.now;
            let (mut due, waiting): (Vec<_>, Vec<_>) = clock
                .pending
                .drain(..)
                .partition(|p| p.due <= now);
            clock.pending = waiting;
            due.sort_by_key(|p| p.due);
            due
        };

        for pending in due {
            if !pending.cancelled.load(Ordering::SeqCst) {
                (pending.on_expiry)();
            }
        }
    }

    /// Number of scheduled callbacks that are neither cancelled nor fired.
    pub fn pending_count(&self) -> usize {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .iter()
            .filter(|p| !p.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Current virtual time since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner).now
    }
}

struct ManualTimeout(Arc<AtomicBool>);

impl ScheduledTimeout for ManualTimeout {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl TimeoutScheduler for ManualTimeoutScheduler {
    fn schedule(
        &self,
        delay: Duration,
        on_expiry: Box<dyn FnOnce() + Send>,
    ) -> Box<dyn ScheduledTimeout> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let due = clock.now + delay;
        clock.pending.push(PendingTimeout {
            due,
            cancelled: Arc::clone(&cancelled),
            on_expiry,
        });
        Box::new(ManualTimeout(cancelled))
    }
}
