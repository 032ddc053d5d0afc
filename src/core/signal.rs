//! Fire-once signals for worker stop requests and pool-wide cancellation.
//!
//! Both signals are built on channel disconnection: listeners `select!` on a
//! receiver that never carries a message, and firing drops the only sender so
//! every listener wakes at once. The sender is taken out from behind a mutex,
//! so it can be dropped at most once and a second `fire` is a plain no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

/// A one-shot signal that transitions from armed to fired at most once.
#[derive(Debug)]
pub struct FireOnce {
    /// Held while armed; dropping it disconnects every listener.
    trigger: Mutex<Option<Sender<()>>>,
    listener: Receiver<()>,
    fired: AtomicBool,
}

impl FireOnce {
    /// Create an armed signal.
    #[must_use]
    pub fn new() -> Self {
        let (trigger, listener) = bounded(0);
        Self {
            trigger: Mutex::new(Some(trigger)),
            listener,
            fired: AtomicBool::new(false),
        }
    }

    /// Fire the signal, waking every listener.
    ///
    /// Returns `true` for the call that actually fired it and `false` for
    /// every later call.
    pub fn fire(&self) -> bool {
        let Some(trigger) = self.trigger.lock().take() else {
            return false;
        };
        // Publish before disconnecting so woken listeners observe it.
        self.fired.store(true, Ordering::Release);
        drop(trigger);
        true
    }

    /// Whether the signal has fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Receiver that becomes disconnected once the signal fires.
    ///
    /// Use it as a `recv` arm in `crossbeam_channel::select!`; it never
    /// yields a value, only `RecvError` after firing. Clone it to move a
    /// listener into another thread.
    #[must_use]
    pub const fn listener(&self) -> &Receiver<()> {
        &self.listener
    }
}

impl Default for FireOnce {
    fn default() -> Self {
        Self::new()
    }
}

/// Broadcast-once cancellation shared by every part of a pool.
///
/// Clones observe the same underlying signal.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    signal: Arc<FireOnce>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the token. Returns `true` only for the first call.
    pub fn cancel(&self) -> bool {
        self.signal.fire()
    }

    /// Whether the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_fired()
    }

    /// Receiver that becomes disconnected on cancellation.
    #[must_use]
    pub fn listener(&self) -> &Receiver<()> {
        self.signal.listener()
    }
}
