//! Process-wide "is mutual TLS on?" flag.
//!
//! The mode is decided by an external control plane and may arrive after the
//! transport starts. Listeners that need it block in
//! [`TlsModeState::wait_initialized`] until it is set or the wait expires.
//!
//! Shared as `Arc<TlsModeState>`; there is no global instance.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, info, warn};

/// How long [`TlsModeState::wait_initialized`] blocks.
pub const DEFAULT_MODE_WAIT: Duration = Duration::from_secs(15);

/// Shared TLS mode with a wait-until-initialised signal.
#[derive(Debug, Default)]
pub struct TlsModeState {
    mode: RwLock<Option<bool>>,
    signal: Mutex<()>,
    changed: Condvar,
}

impl TlsModeState {
    /// Unset mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mode and wake every waiter.
    pub fn set_tls_mode(&self, enabled: bool) {
        let previous = self.mode.write().replace(enabled);
        let _guard = self.signal.lock();
        self.changed.notify_all();

        if previous == Some(enabled) {
            debug!(enabled, "TLS mode unchanged");
        } else {
            info!(enabled, ?previous, "TLS mode set");
        }
    }

    /// Current mode, `None` until first set.
    pub fn tls_mode(&self) -> Option<bool> {
        *self.mode.read()
    }

    /// `true` when a mode has been set and differs from `candidate`.
    pub fn is_mode_updated(&self, candidate: bool) -> bool {
        self.tls_mode().is_some_and(|current| current != candidate)
    }

    /// Block up to [`DEFAULT_MODE_WAIT`] for the mode to be set.
    pub fn wait_initialized(&self) -> bool {
        self.wait_initialized_for(DEFAULT_MODE_WAIT)
    }

    /// Block up to `timeout` for the mode to be set.
    ///
    /// Returns the mode, or `false` when it is still unset at the deadline.
    /// A timeout too large to express as a deadline waits indefinitely.
    pub fn wait_initialized_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.signal.lock();
        loop {
            if let Some(enabled) = self.tls_mode() {
                return enabled;
            }
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut guard, deadline).timed_out() {
                        break;
                    }
                }
                None => self.changed.wait(&mut guard),
            }
        }

        self.tls_mode().unwrap_or_else(|| {
            warn!(
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "TLS mode not initialised before timeout; assuming plaintext"
            );
            false
        })
    }

    /// Forget the mode.
    pub fn reset(&self) {
        *self.mode.write() = None;
        debug!("TLS mode reset");
    }
}
