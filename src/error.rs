//! Error types.
//!
//! Contract violations by the decoder or interpreter (empty batches, bad
//! length fields, replacing a token that does not exist) panic. Only the
//! runtime conditions below are reported as values.

use std::io;

/// Errors reported by the release thread and completion waiters.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The OS refused to spawn the release thread.
    #[error("failed to spawn release thread")]
    Spawn(#[source] io::Error),

    /// A completion wait gave up before the batch was consumed.
    #[error("timed out waiting for batch completion")]
    Timeout,

    /// The completion signal was dropped without ever firing.
    #[error("completion signal dropped before firing")]
    Abandoned,
}
