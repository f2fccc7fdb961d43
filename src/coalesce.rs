//! Coalescing: Whether a batch boundary is invisible to the interpreter.
//!
//! Some interpretation (line-ending handling in particular) depends on which
//! tokens are adjacent. Two batches may only be treated as one stream when
//! everything left before the boundary is transparent text, so that
//! interpreting them together is indistinguishable from interpreting the
//! underlying bytes in one uninterrupted run.
//!
//! The one exception is a lone CR at the end of a batch followed by a
//! CR/LF run: some line disciplines split a duplicated CR exactly at a read
//! boundary, and the duplicate is idempotent for cursor positioning.
//!
//! Anything not covered here does not coalesce.

use crate::batch::TokenBatch;
use crate::token::Token;

/// Whether `batch` and a following batch starting with `next_token` may be
/// treated as one uninterrupted token stream.
///
/// Only the unconsumed part of `batch` is considered.
#[inline]
pub fn can_coalesce(batch: &TokenBatch, next_token: Option<&Token>) -> bool {
    tokens_coalesce(batch.remaining(), next_token)
}

/// [`can_coalesce`] over a bare slice of remaining tokens.
pub fn tokens_coalesce(remaining: &[Token], next_token: Option<&Token>) -> bool {
    let Some((last, all_but_last)) = remaining.split_last() else {
        return true;
    };
    if !all_but_last.iter().all(|token| token.kind().is_transparent()) {
        return false;
    }
    if last.kind().is_transparent() {
        return true;
    }
    last.is_bare_carriage_return() && next_token.is_some_and(Token::starts_with_carriage_return)
}
