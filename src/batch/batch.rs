//! Token Batch: The unit handed from the decoder to the interpreter.
//!
//! A batch owns its tokens outright. The cursor only moves forward, and the
//! storage is freed exactly once: holding it in an `Option` means taking it
//! *is* the release, so a second release (explicit, or from `Drop`) finds
//! nothing to free.
//!
//! ```text
//!   0          next_index                count
//!   ├── consumed ──┼────── remaining() ──────┤
//!                  ▲
//!                peek()
//! ```

use super::ByteLengths;
use crate::coalesce;
use crate::release::{self, ReleaseMode, ReleaseQueue};
use crate::signal::CompletionSignal;
use crate::token::Token;
use std::fmt;
use std::sync::Arc;

/// An ordered, fixed-length batch of decoded tokens.
pub struct TokenBatch {
    /// Token storage; `None` once released.
    tokens: Option<Vec<Token>>,
    /// Number of tokens at construction.
    count: usize,
    /// Index of the next token to yield.
    next_index: usize,
    /// Input bytes that produced this batch.
    lengths: ByteLengths,
    /// Fired when the cursor reaches the end.
    signal: Option<CompletionSignal>,
    /// Queue for async release (None = process-wide queue).
    queue: Option<Arc<dyn ReleaseQueue>>,
}

impl TokenBatch {
    /// Create a batch from fully decoded tokens.
    ///
    /// # Panics
    ///
    /// Panics if `tokens` is empty, if `length_total` is zero, or if
    /// `length_excluding_inband` exceeds `length_total`. Each of these means
    /// the decoder produced a malformed batch.
    pub fn new(
        tokens: Vec<Token>,
        length_total: usize,
        length_excluding_inband: usize,
        completion_signal: Option<CompletionSignal>,
    ) -> Self {
        assert!(!tokens.is_empty(), "token batch must hold at least one token");
        assert!(length_total > 0, "token batch must cover at least one byte");
        assert!(
            length_excluding_inband <= length_total,
            "length excluding in-band signaling ({length_excluding_inband}) exceeds total ({length_total})"
        );

        Self {
            count: tokens.len(),
            tokens: Some(tokens),
            next_index: 0,
            lengths: ByteLengths::new(length_total, length_excluding_inband),
            signal: completion_signal,
            queue: None,
        }
    }

    /// Send async releases of this batch to `queue` instead of the
    /// process-wide one.
    #[must_use]
    pub fn with_release_queue(mut self, queue: Arc<dyn ReleaseQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Number of tokens the batch was built with.
    #[inline]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Index of the next token to yield.
    #[inline]
    pub const fn next_index(&self) -> usize {
        self.next_index
    }

    /// Tokens not yet consumed.
    #[inline]
    pub const fn remaining_count(&self) -> usize {
        self.count - self.next_index
    }

    /// Whether every token has been consumed or skipped.
    #[inline]
    pub const fn is_drained(&self) -> bool {
        self.next_index == self.count
    }

    /// Whether the token storage has been freed.
    #[inline]
    pub const fn is_released(&self) -> bool {
        self.tokens.is_none()
    }

    /// Whether a completion signal is still waiting to fire.
    #[inline]
    pub const fn is_armed(&self) -> bool {
        self.signal.is_some()
    }

    /// Total input bytes behind this batch.
    #[inline]
    pub const fn length_total(&self) -> usize {
        self.lengths.total
    }

    /// Input bytes behind this batch, minus in-band signaling.
    #[inline]
    pub const fn length_excluding_inband(&self) -> usize {
        self.lengths.excluding_inband
    }

    /// Both byte lengths.
    #[inline]
    pub const fn lengths(&self) -> ByteLengths {
        self.lengths
    }

    fn storage(&self) -> &[Token] {
        self.tokens.as_deref().unwrap_or(&[])
    }

    /// The next token, without advancing.
    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.storage().get(self.next_index)
    }

    /// Yield the next token and advance.
    ///
    /// Returns `None` once the batch is drained.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Token> {
        if self.is_drained() {
            return None;
        }
        let index = self.next_index;
        self.advance();
        self.storage().get(index)
    }

    /// Advance past the next token; returns whether tokens remain.
    pub fn consume(&mut self) -> bool {
        if self.is_drained() {
            return false;
        }
        self.advance();
        !self.is_drained()
    }

    /// Abandon every remaining token.
    ///
    /// Fires the completion signal if it has not fired yet. Calling this on a
    /// drained batch does nothing.
    pub fn skip_to_end(&mut self) {
        if !self.is_drained() {
            tracing::trace!(skipped = self.remaining_count(), "skipping rest of batch");
            self.next_index = self.count;
        }
        self.fire_signal();
    }

    fn advance(&mut self) {
        self.next_index += 1;
        if self.is_drained() {
            self.fire_signal();
        }
    }

    fn fire_signal(&mut self) {
        if let Some(signal) = self.signal.take() {
            signal.fire();
        }
    }

    /// Overwrite the final token in place.
    ///
    /// Only the producer may call this, before handing the batch off.
    ///
    /// # Panics
    ///
    /// Panics if the batch has no last slot (its storage was released).
    pub fn replace_last(&mut self, token: Token) {
        let Some(slot) = self.tokens.as_mut().and_then(|tokens| tokens.last_mut()) else {
            panic!("replace_last on a batch with no tokens");
        };
        *slot = token;
    }

    /// Tokens from the cursor to the end; does not advance.
    #[inline]
    pub fn remaining(&self) -> &[Token] {
        self.storage().get(self.next_index..).unwrap_or(&[])
    }

    /// Whether the boundary after this batch is transparent when the next
    /// batch starts with `next_token`.
    #[inline]
    pub fn can_coalesce(&self, next_token: Option<&Token>) -> bool {
        coalesce::can_coalesce(self, next_token)
    }

    /// Free the token storage.
    ///
    /// Any unconsumed tokens are skipped first, so an armed signal always
    /// fires. Releasing twice is a no-op.
    pub fn release(&mut self, mode: ReleaseMode) {
        let Some(tokens) = self.tokens.take() else {
            return;
        };
        self.skip_to_end();
        tracing::trace!(count = tokens.len(), ?mode, "releasing batch");
        match mode {
            ReleaseMode::Sync => drop(tokens),
            ReleaseMode::Async => match &self.queue {
                Some(queue) => queue.submit(tokens),
                None => release::submit_global(tokens),
            },
        }
    }
}

impl Drop for TokenBatch {
    fn drop(&mut self) {
        self.release(ReleaseMode::Async);
    }
}

impl fmt::Debug for TokenBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBatch")
            .field("count", &self.count)
            .field("next_index", &self.next_index)
            .field("lengths", &self.lengths)
            .field("armed", &self.is_armed())
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::completion_pair;
    use crate::token::CR;
    use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    fn tokens(n: usize) -> Vec<Token> {
        (0..n).map(|i| Token::ascii_run(format!("t{i}"))).collect()
    }

    fn batch(n: usize) -> TokenBatch {
        TokenBatch::new(tokens(n), n * 2, n * 2, None)
    }

    /// Counts what it is handed and frees it on the spot.
    #[derive(Default)]
    struct CountingQueue {
        submitted: Mutex<Vec<usize>>,
    }

    impl ReleaseQueue for CountingQueue {
        fn submit(&self, tokens: Vec<Token>) {
            self.submitted.lock().unwrap().push(tokens.len());
        }
    }

    /// Frees on a worker thread, but only once the test opens the gate.
    struct GatedQueue {
        jobs: Sender<Vec<Token>>,
    }

    impl GatedQueue {
        fn spawn() -> (Self, Sender<()>, Receiver<usize>) {
            let (jobs, job_rx) = unbounded::<Vec<Token>>();
            let (gate_tx, gate_rx) = bounded::<()>(1);
            let (done_tx, done_rx) = unbounded();
            thread::spawn(move || {
                for tokens in job_rx {
                    let _ = gate_rx.recv();
                    let count = tokens.len();
                    drop(tokens);
                    let _ = done_tx.send(count);
                }
            });
            (Self { jobs }, gate_tx, done_rx)
        }
    }

    impl ReleaseQueue for GatedQueue {
        fn submit(&self, tokens: Vec<Token>) {
            let _ = self.jobs.send(tokens);
        }
    }

    #[test]
    fn test_yields_each_token_once_in_order() {
        let mut batch = batch(4);
        let mut seen = Vec::new();
        while let Some(token) = batch.next() {
            seen.push(token.bytes().to_vec());
        }
        assert_eq!(seen, vec![b"t0".to_vec(), b"t1".to_vec(), b"t2".to_vec(), b"t3".to_vec()]);
        assert!(batch.next().is_none());
        assert!(batch.is_drained());
    }

    #[test]
    fn test_consume_reports_remaining() {
        let mut batch = batch(3);
        assert_eq!(batch.peek().unwrap().bytes(), b"t0");
        assert!(batch.consume());
        assert_eq!(batch.peek().unwrap().bytes(), b"t1");
        assert!(batch.consume());
        assert!(!batch.consume());
        assert!(!batch.consume());
        assert_eq!(batch.next_index(), 3);
    }

    #[test]
    fn test_peek_has_no_side_effects() {
        let batch = batch(2);
        assert_eq!(batch.peek(), batch.peek());
        assert_eq!(batch.next_index(), 0);
        assert_eq!(batch.remaining().len(), 2);
    }

    #[test]
    fn test_remaining_tracks_cursor() {
        let mut batch = batch(3);
        batch.consume();
        assert_eq!(batch.remaining().len(), 2);
        assert_eq!(batch.remaining_count(), 2);
        assert_eq!(batch.remaining()[0].bytes(), b"t1");
    }

    #[test]
    fn test_signal_fires_when_drained() {
        let (signal, waiter) = completion_pair();
        let mut batch = TokenBatch::new(tokens(2), 4, 4, Some(signal));

        assert!(batch.consume());
        assert!(!waiter.is_complete());
        assert!(!batch.consume());
        assert!(waiter.is_complete());
        assert!(!batch.is_armed());
    }

    #[test]
    fn test_signal_fires_exactly_once() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (signal, _waiter) = completion_pair();
        let signal = signal.with_callback(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        let mut batch = TokenBatch::new(tokens(2), 4, 4, Some(signal));

        while batch.next().is_some() {}
        batch.skip_to_end();
        batch.consume();
        batch.release(ReleaseMode::Sync);
        drop(batch);

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_skip_to_end_is_terminal_and_idempotent() {
        let (signal, waiter) = completion_pair();
        let mut batch = TokenBatch::new(tokens(5), 10, 10, Some(signal));
        batch.consume();

        batch.skip_to_end();
        assert!(waiter.is_complete());
        assert!(batch.peek().is_none());
        assert!(!batch.consume());
        assert!(batch.remaining().is_empty());

        batch.skip_to_end();
        assert!(batch.peek().is_none());
        assert_eq!(batch.next_index(), 5);
    }

    #[test]
    fn test_unarmed_batch_never_signals() {
        let mut batch = batch(1);
        assert!(!batch.is_armed());
        batch.skip_to_end();
        assert!(!batch.is_armed());
    }

    #[test]
    fn test_replace_last_preserves_count() {
        let mut batch = batch(3);
        batch.replace_last(Token::control_char(CR));

        assert_eq!(batch.count(), 3);
        assert_eq!(batch.remaining()[0].bytes(), b"t0");
        assert_eq!(batch.remaining()[1].bytes(), b"t1");
        assert!(batch.remaining()[2].is_bare_carriage_return());
    }

    #[test]
    #[should_panic(expected = "no tokens")]
    fn test_replace_last_after_release_panics() {
        let mut batch = batch(1);
        batch.release(ReleaseMode::Sync);
        batch.replace_last(Token::ascii_run("x"));
    }

    #[test]
    #[should_panic(expected = "at least one byte")]
    fn test_zero_length_panics() {
        let _ = TokenBatch::new(tokens(1), 0, 0, None);
    }

    #[test]
    #[should_panic(expected = "exceeds total")]
    fn test_inconsistent_lengths_panic() {
        let _ = TokenBatch::new(tokens(1), 4, 5, None);
    }

    #[test]
    #[should_panic(expected = "at least one token")]
    fn test_empty_batch_panics() {
        let _ = TokenBatch::new(Vec::new(), 4, 4, None);
    }

    #[test]
    fn test_release_is_idempotent() {
        let queue = Arc::new(CountingQueue::default());
        let mut batch = batch(3).with_release_queue(queue.clone());

        batch.release(ReleaseMode::Async);
        batch.release(ReleaseMode::Async);
        batch.release(ReleaseMode::Sync);
        assert!(batch.is_released());
        drop(batch);

        assert_eq!(*queue.submitted.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_sync_release_bypasses_queue() {
        let queue = Arc::new(CountingQueue::default());
        let mut batch = batch(3).with_release_queue(queue.clone());

        batch.release(ReleaseMode::Sync);
        drop(batch);

        assert!(queue.submitted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_releases_async() {
        let queue = Arc::new(CountingQueue::default());
        drop(batch(2).with_release_queue(queue.clone()));
        assert_eq!(*queue.submitted.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_drop_fires_pending_signal() {
        let (signal, waiter) = completion_pair();
        let queue = Arc::new(CountingQueue::default());
        let batch = TokenBatch::new(tokens(2), 4, 4, Some(signal)).with_release_queue(queue);

        drop(batch);
        assert!(waiter.wait().is_ok());
    }

    #[test]
    fn test_release_skips_remaining() {
        let mut batch = batch(3);
        batch.release(ReleaseMode::Sync);
        assert!(batch.is_drained());
        assert!(batch.peek().is_none());
        assert!(batch.next().is_none());
        assert!(batch.remaining().is_empty());
    }

    #[test]
    fn test_async_release_returns_before_free() {
        let (queue, gate, done) = GatedQueue::spawn();
        let mut batch = TokenBatch::new(tokens(1000), 2000, 2000, None)
            .with_release_queue(Arc::new(queue));

        batch.release(ReleaseMode::Async);
        assert!(batch.is_released());
        // The worker is parked on the gate, so nothing has been freed yet.
        assert!(done.recv_timeout(Duration::from_millis(20)).is_err());

        gate.send(()).unwrap();
        assert_eq!(done.recv_timeout(Duration::from_secs(5)).unwrap(), 1000);
    }

    #[test]
    fn test_lengths() {
        let batch = TokenBatch::new(tokens(2), 10, 7, None);
        assert_eq!(batch.length_total(), 10);
        assert_eq!(batch.length_excluding_inband(), 7);
        assert_eq!(batch.lengths().inband(), 3);
    }
}
