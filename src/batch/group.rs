//! Batch Group: Consecutive batches drained as one token stream.
//!
//! The consumer pulls a group off the front of its queue at each turn. A
//! group keeps growing while the boundary after its last batch is
//! transparent to whatever the next queued batch starts with, so a run like
//! `cat` output split across many reads is interpreted without artificial
//! breaks.

use super::{ByteLengths, TokenBatch};
use crate::release::ReleaseMode;
use crate::token::Token;
use std::collections::VecDeque;

/// A run of coalesced batches.
#[derive(Debug)]
pub struct BatchGroup {
    batches: Vec<TokenBatch>,
    /// Index of the first batch that may still have tokens.
    current: usize,
}

impl BatchGroup {
    /// Pop the next group off the front of `queue`.
    ///
    /// Returns `None` if the queue is empty. Otherwise the group holds the
    /// front batch plus every following batch joined to it by
    /// [`can_coalesce`](crate::can_coalesce).
    pub fn take_from(queue: &mut VecDeque<TokenBatch>) -> Option<Self> {
        let mut batches = vec![queue.pop_front()?];
        loop {
            let joins = match (batches.last(), queue.front()) {
                (Some(last), Some(next)) => last.can_coalesce(next.peek()),
                _ => false,
            };
            if !joins {
                break;
            }
            let Some(next) = queue.pop_front() else {
                break;
            };
            batches.push(next);
        }
        Some(Self {
            batches,
            current: 0,
        })
    }

    /// Number of batches in the group.
    #[inline]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether the group holds no batches (never true for a taken group).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// The batches, in order.
    #[inline]
    pub fn batches(&self) -> &[TokenBatch] {
        &self.batches
    }

    /// Tokens across all batches at construction.
    pub fn token_count(&self) -> usize {
        self.batches.iter().map(TokenBatch::count).sum()
    }

    /// Tokens not yet consumed, across all batches.
    pub fn remaining_count(&self) -> usize {
        self.batches.iter().map(TokenBatch::remaining_count).sum()
    }

    /// Remaining token count of each batch.
    pub fn remaining_counts(&self) -> Vec<usize> {
        self.batches.iter().map(TokenBatch::remaining_count).collect()
    }

    /// Summed byte lengths of every batch.
    pub fn lengths(&self) -> ByteLengths {
        self.batches.iter().map(TokenBatch::lengths).sum()
    }

    fn settle(&mut self) {
        while self
            .batches
            .get(self.current)
            .is_some_and(TokenBatch::is_drained)
        {
            self.current += 1;
        }
    }

    /// The next token in the group.
    pub fn peek(&self) -> Option<&Token> {
        self.batches[self.current..].iter().find_map(TokenBatch::peek)
    }

    /// Yield the next token, crossing batch boundaries.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Token> {
        self.settle();
        self.batches.get_mut(self.current)?.next()
    }

    /// Advance past the next token; returns whether tokens remain.
    pub fn consume(&mut self) -> bool {
        self.settle();
        let Some(batch) = self.batches.get_mut(self.current) else {
            return false;
        };
        batch.consume();
        self.settle();
        self.current < self.batches.len()
    }

    /// Abandon every remaining token in every batch.
    pub fn skip_to_end(&mut self) {
        for batch in &mut self.batches {
            batch.skip_to_end();
        }
        self.current = self.batches.len();
    }

    /// Release the storage of every fully drained batch.
    pub fn release_drained(&mut self, mode: ReleaseMode) {
        for batch in self.batches.iter_mut().filter(|batch| batch.is_drained()) {
            batch.release(mode);
        }
    }

    /// Take the batches back out of the group.
    pub fn into_batches(self) -> Vec<TokenBatch> {
        self.batches
    }
}
