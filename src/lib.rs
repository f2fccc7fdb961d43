//! # tokenbatch
//!
//! Batched hand-off of decoded terminal tokens from a decoder thread to the
//! thread that applies them to terminal state.
//!
//! Under heavy output (`cat` of a large file, full-screen repaints) handing
//! tokens over one at a time costs more in synchronization than the tokens
//! themselves. The decoder instead hands over whole [`TokenBatch`]es.
//!
//! ## Core Concepts
//!
//! - **Owned batches**: a batch owns its tokens and frees them exactly once
//! - **Completion signal**: a one-shot signal fired when a batch is drained
//!   or abandoned, used by the decoder for backpressure
//! - **Coalescing**: deciding whether a batch boundary is transparent, so
//!   consecutive batches can be interpreted as one stream
//! - **Deferred release**: freeing large batches on a background thread
//!
//! ## Example
//!
//! ```rust
//! use tokenbatch::{completion_pair, Token, TokenBatch};
//!
//! let (signal, waiter) = completion_pair();
//! let mut batch = TokenBatch::new(
//!     vec![Token::ascii_run("hello"), Token::mixed_run("\r\n")],
//!     7,
//!     7,
//!     Some(signal),
//! );
//!
//! while let Some(token) = batch.next() {
//!     // Apply the token to the terminal model here.
//!     let _ = token.kind();
//! }
//! assert!(waiter.is_complete());
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod batch;
pub mod coalesce;
pub mod error;
pub mod release;
pub mod signal;
pub mod token;

// Re-exports for convenience
pub use batch::{BatchGroup, ByteLengths, TokenBatch};
pub use coalesce::{can_coalesce, tokens_coalesce};
pub use error::BatchError;
pub use release::{DeferredReleaser, ReleaseHandle, ReleaseMode, ReleaseQueue, ReleaseStats, ReleaserConfig};
pub use signal::{completion_pair, BackpressureGate, BackpressureLevel, CompletionSignal, CompletionWaiter, GateConfig};
pub use token::{KindSet, Token, TokenKind, CR, LF};
