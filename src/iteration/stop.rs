//! Cancellation for paced loops.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Cloneable cancellation flag that also interrupts pacing sleeps.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopHandle {
    /// Create a handle that has not been stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake any sleeper.
    pub fn stop(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `duration` unless stopped first. Returns `true` if stopped.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        if duration.is_zero() {
            return *guard;
        }
        let (guard, _) = cvar
            .wait_timeout_while(guard, duration, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}
