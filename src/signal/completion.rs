//! Completion: The one-shot signal a batch fires when it is consumed.
//!
//! A [`CompletionSignal`] is armed either against a [`CompletionWaiter`]
//! (see [`completion_pair`]) or against a slot of a
//! [`BackpressureGate`](super::BackpressureGate). Firing takes the signal by
//! value, so a signal can never fire twice.
//!
//! Waiters observe a channel disconnect rather than a message. That lets any
//! number of cloned waiters see the same edge, and lets them tell a fired
//! signal apart from one that was dropped unfired.

use crate::error::BatchError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Callback run on the thread that spends the signal.
type OnSignaled = Box<dyn FnOnce() + Send>;

/// What firing a signal notifies.
enum Target {
    /// Wake every [`CompletionWaiter`] of the pair.
    Waiters {
        fired: Arc<AtomicBool>,
        /// Dropping this disconnects the waiters' receiver.
        closer: Sender<()>,
    },
    /// Return one slot to a backpressure gate.
    Slot(Receiver<()>),
}

struct Armed {
    target: Target,
    on_signaled: Option<OnSignaled>,
}

/// A one-shot completion signal.
///
/// Fired at most once, by [`fire`](Self::fire). Dropping an unfired signal
/// still returns its gate slot (so the producer cannot deadlock) and waiters
/// report [`BatchError::Abandoned`].
pub struct CompletionSignal {
    armed: Option<Armed>,
}

impl CompletionSignal {
    pub(super) const fn for_slot(slot: Receiver<()>) -> Self {
        Self {
            armed: Some(Armed {
                target: Target::Slot(slot),
                on_signaled: None,
            }),
        }
    }

    /// Attach a callback run at most once, on the thread that spends the
    /// signal.
    ///
    /// It runs after the signal fires, and also when a gate-slot signal is
    /// dropped unfired, so it runs exactly once per returned slot. A dropped
    /// waiter-pair signal skips it.
    #[must_use]
    pub fn with_callback(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        if let Some(armed) = self.armed.as_mut() {
            armed.on_signaled = Some(Box::new(callback));
        }
        self
    }

    /// Fire the signal.
    pub fn fire(mut self) {
        let Some(armed) = self.armed.take() else {
            return;
        };
        match armed.target {
            Target::Waiters { fired, closer } => {
                fired.store(true, Ordering::Release);
                drop(closer);
            }
            Target::Slot(slot) => {
                let _ = slot.try_recv();
            }
        }
        tracing::trace!("completion signal fired");
        if let Some(callback) = armed.on_signaled {
            callback();
        }
    }
}

impl Drop for CompletionSignal {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            tracing::trace!("completion signal dropped unfired");
            if let Target::Slot(slot) = armed.target {
                let _ = slot.try_recv();
                if let Some(callback) = armed.on_signaled {
                    callback();
                }
            }
        }
    }
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.armed.as_ref().map(|armed| &armed.target) {
            None => "spent",
            Some(Target::Waiters { .. }) => "waiters",
            Some(Target::Slot(_)) => "gate slot",
        };
        f.debug_struct("CompletionSignal")
            .field("target", &target)
            .finish()
    }
}

/// Producer-side view of a [`CompletionSignal`].
#[derive(Debug, Clone)]
pub struct CompletionWaiter {
    fired: Arc<AtomicBool>,
    closed: Receiver<()>,
}

impl CompletionWaiter {
    /// Whether the signal has fired.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Block until the signal fires.
    pub fn wait(&self) -> Result<(), BatchError> {
        // Nothing is ever sent, so recv only returns on disconnect.
        let _ = self.closed.recv();
        self.outcome()
    }

    /// Block until the signal fires or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), BatchError> {
        match self.closed.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => Err(BatchError::Timeout),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => self.outcome(),
        }
    }

    fn outcome(&self) -> Result<(), BatchError> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(BatchError::Abandoned)
        }
    }
}

/// Create a fresh signal and its waiter.
pub fn completion_pair() -> (CompletionSignal, CompletionWaiter) {
    let fired = Arc::new(AtomicBool::new(false));
    let (closer, closed) = bounded(0);
    let signal = CompletionSignal {
        armed: Some(Armed {
            target: Target::Waiters {
                fired: Arc::clone(&fired),
                closer,
            },
            on_signaled: None,
        }),
    };
    (signal, CompletionWaiter { fired, closed })
}
