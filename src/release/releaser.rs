//! Releaser Actor: Dedicated thread that frees batch storage.
//!
//! Dropping a large batch means dropping thousands of individually
//! allocated tokens. This actor takes that work off the thread that decided
//! to discard the batch: submission is a single channel send and never
//! blocks.

use super::ReleaseQueue;
use crate::error::BatchError;
use crate::token::Token;
use crossbeam_channel::{unbounded, Receiver, SendError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Configuration for the release thread.
#[derive(Debug, Clone)]
pub struct ReleaserConfig {
    /// Name given to the OS thread.
    pub thread_name: String,
    /// Stack size for the thread (None = platform default).
    pub stack_size: Option<usize>,
}

impl Default for ReleaserConfig {
    fn default() -> Self {
        Self {
            thread_name: "tokenbatch-release".to_string(),
            stack_size: None,
        }
    }
}

/// Release statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseStats {
    /// Batches handed to the thread.
    pub submitted: u64,
    /// Batches whose storage has been freed.
    pub batches_freed: u64,
    /// Tokens freed across all batches.
    pub tokens_freed: u64,
}

impl ReleaseStats {
    /// Batches submitted but not yet freed.
    pub const fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.batches_freed)
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    batches_freed: AtomicU64,
    tokens_freed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ReleaseStats {
        ReleaseStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            batches_freed: self.batches_freed.load(Ordering::Relaxed),
            tokens_freed: self.tokens_freed.load(Ordering::Relaxed),
        }
    }
}

/// Cloneable submission side of a [`DeferredReleaser`].
#[derive(Debug, Clone)]
pub struct ReleaseHandle {
    sender: Sender<Vec<Token>>,
    counters: Arc<Counters>,
}

impl ReleaseHandle {
    /// Snapshot of the release statistics.
    pub fn stats(&self) -> ReleaseStats {
        self.counters.snapshot()
    }
}

impl ReleaseQueue for ReleaseHandle {
    fn submit(&self, tokens: Vec<Token>) {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        if let Err(SendError(tokens)) = self.sender.send(tokens) {
            // Thread is gone; free here instead of leaking.
            tracing::warn!(count = tokens.len(), "release thread gone, freeing inline");
            free(tokens, &self.counters);
        }
    }
}

/// Background release queue.
#[derive(Debug)]
pub struct DeferredReleaser {
    /// Handle to the release thread.
    thread: Option<JoinHandle<()>>,
    /// Submission handle; dropping every clone stops the thread.
    handle: Option<ReleaseHandle>,
}

impl DeferredReleaser {
    /// Spawn the release thread.
    pub fn spawn(config: &ReleaserConfig) -> Result<Self, BatchError> {
        let (sender, receiver) = unbounded::<Vec<Token>>();
        let counters = Arc::new(Counters::default());
        let thread_counters = Arc::clone(&counters);

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }
        let thread = builder
            .spawn(move || Self::run_loop(&receiver, &thread_counters))
            .map_err(BatchError::Spawn)?;

        tracing::debug!(name = %config.thread_name, "release thread started");

        Ok(Self {
            thread: Some(thread),
            handle: Some(ReleaseHandle { sender, counters }),
        })
    }

    /// A new submission handle for this releaser.
    ///
    /// The thread keeps running while any handle is alive.
    pub fn handle(&self) -> ReleaseHandle {
        self.handle
            .clone()
            .unwrap_or_else(|| unreachable!("handle is only taken on join or drop"))
    }

    /// Snapshot of the release statistics.
    pub fn stats(&self) -> ReleaseStats {
        self.handle
            .as_ref()
            .map_or_else(ReleaseStats::default, ReleaseHandle::stats)
    }

    /// Stop accepting work from this value and wait for the thread to finish.
    ///
    /// The thread drains everything already submitted, and only exits once
    /// every outstanding [`ReleaseHandle`] has been dropped.
    pub fn join(mut self) -> ReleaseStats {
        let stats = self
            .handle
            .take()
            .map(|handle| Arc::clone(&handle.counters));
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        stats.map_or_else(ReleaseStats::default, |counters| counters.snapshot())
    }

    /// Hand the thread over to run for the rest of the process.
    pub(super) fn detach(mut self) -> ReleaseHandle {
        self.thread = None;
        self.handle
            .take()
            .unwrap_or_else(|| unreachable!("detach consumes a live releaser"))
    }

    /// Main release loop.
    fn run_loop(receiver: &Receiver<Vec<Token>>, counters: &Counters) {
        for tokens in receiver {
            free(tokens, counters);
        }
        tracing::debug!("release thread exiting");
    }
}

impl ReleaseQueue for DeferredReleaser {
    fn submit(&self, tokens: Vec<Token>) {
        match &self.handle {
            Some(handle) => handle.submit(tokens),
            None => drop(tokens),
        }
    }
}

impl Drop for DeferredReleaser {
    fn drop(&mut self) {
        // Dropping our sender lets the thread exit once the queue drains.
        self.handle = None;
    }
}

fn free(tokens: Vec<Token>, counters: &Counters) {
    let count = tokens.len();
    drop(tokens);
    counters.batches_freed.fetch_add(1, Ordering::Relaxed);
    counters
        .tokens_freed
        .fetch_add(u64::try_from(count).unwrap_or(u64::MAX), Ordering::Relaxed);
    tracing::trace!(count, "freed batch storage");
}
