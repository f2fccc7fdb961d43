//! Backpressure Gate: Bounds how many armed batches may be outstanding.
//!
//! The gate is a bounded channel used as a counting semaphore. Acquiring a
//! slot pushes a unit into the channel (blocking while it is full); firing
//! the returned [`CompletionSignal`] pops one back out.

use super::CompletionSignal;
use crate::error::BatchError;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// Configuration for a [`BackpressureGate`].
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Number of batches that may be in flight at once.
    pub depth: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { depth: 40 }
    }
}

/// How full the gate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackpressureLevel {
    /// More than 75% of slots free.
    None,
    /// 50-75% free.
    Light,
    /// 25-50% free.
    Moderate,
    /// Less than 25% free.
    Heavy,
    /// No free slots; the producer blocks on the next acquire.
    Blocked,
}

/// Fixed-depth slot gate for the decoder thread.
#[derive(Debug, Clone)]
pub struct BackpressureGate {
    slots_tx: Sender<()>,
    slots_rx: Receiver<()>,
    depth: usize,
}

impl BackpressureGate {
    /// Create a gate with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.depth` is zero.
    pub fn new(config: &GateConfig) -> Self {
        assert!(config.depth > 0, "backpressure gate needs at least one slot");
        let (slots_tx, slots_rx) = bounded(config.depth);
        Self {
            slots_tx,
            slots_rx,
            depth: config.depth,
        }
    }

    /// Take a slot, blocking while all slots are in use.
    pub fn acquire(&self) -> CompletionSignal {
        // Cannot disconnect: the gate owns a receiver.
        let _ = self.slots_tx.send(());
        self.armed()
    }

    /// Take a slot if one is free.
    pub fn try_acquire(&self) -> Option<CompletionSignal> {
        match self.slots_tx.try_send(()) {
            Ok(()) => Some(self.armed()),
            Err(TrySendError::Full(())) => None,
            Err(TrySendError::Disconnected(())) => unreachable!("gate owns a receiver"),
        }
    }

    /// Take a slot, blocking at most `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<CompletionSignal, BatchError> {
        match self.slots_tx.send_timeout((), timeout) {
            Ok(()) => Ok(self.armed()),
            Err(SendTimeoutError::Timeout(()) | SendTimeoutError::Disconnected(())) => {
                Err(BatchError::Timeout)
            }
        }
    }

    fn armed(&self) -> CompletionSignal {
        CompletionSignal::for_slot(self.slots_rx.clone())
    }

    /// Total number of slots.
    #[inline]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Number of free slots.
    #[inline]
    pub fn available_slots(&self) -> usize {
        self.depth - self.slots_tx.len()
    }

    /// Current fill level.
    #[allow(clippy::cast_precision_loss)]
    pub fn backpressure_level(&self) -> BackpressureLevel {
        let available = self.available_slots();
        if available == 0 {
            return BackpressureLevel::Blocked;
        }
        let ratio = available as f64 / self.depth as f64;
        if ratio < 0.25 {
            BackpressureLevel::Heavy
        } else if ratio < 0.50 {
            BackpressureLevel::Moderate
        } else if ratio < 0.75 {
            BackpressureLevel::Light
        } else {
            BackpressureLevel::None
        }
    }
}

impl Default for BackpressureGate {
    fn default() -> Self {
        Self::new(&GateConfig::default())
    }
}
