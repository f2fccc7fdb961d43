//! Release module: Freeing batch storage exactly once.
//!
//! A batch frees its tokens either on the calling thread
//! ([`ReleaseMode::Sync`]) or by handing them to a [`ReleaseQueue`]
//! ([`ReleaseMode::Async`]). Unless a batch was given its own queue, async
//! releases go to a process-wide [`DeferredReleaser`] spawned on first use.

mod releaser;

pub use releaser::{DeferredReleaser, ReleaseHandle, ReleaseStats, ReleaserConfig};

use crate::token::Token;
use std::sync::OnceLock;

/// Where a release frees the storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseMode {
    /// Free on the calling thread.
    Sync,
    /// Hand the storage to a background queue and return immediately.
    Async,
}

/// A sink that frees batch storage off the calling thread.
///
/// Implementations must accept submissions from any thread and must not
/// block the submitter.
pub trait ReleaseQueue: Send + Sync {
    /// Take ownership of `tokens` and free them later.
    fn submit(&self, tokens: Vec<Token>);
}

static GLOBAL: OnceLock<Option<ReleaseHandle>> = OnceLock::new();

/// The process-wide release queue, if its thread could be spawned.
pub fn global() -> Option<&'static ReleaseHandle> {
    GLOBAL
        .get_or_init(|| match DeferredReleaser::spawn(&ReleaserConfig::default()) {
            Ok(releaser) => Some(releaser.detach()),
            Err(err) => {
                tracing::warn!(error = %err, "no release thread; async releases run inline");
                None
            }
        })
        .as_ref()
}

/// Submit to the process-wide queue, freeing inline if it is unavailable.
pub(crate) fn submit_global(tokens: Vec<Token>) {
    match global() {
        Some(handle) => handle.submit(tokens),
        None => drop(tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::TokenBatch;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_dropped_batch_frees_through_global_queue() {
        let handle = global().unwrap();
        // Other tests share the global queue, so only look for growth.
        let before = handle.stats().tokens_freed;

        let tokens: Vec<Token> = (0..64).map(|i| Token::ascii_run(format!("g{i}"))).collect();
        drop(TokenBatch::new(tokens, 64, 64, None));

        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.stats().tokens_freed < before + 64 {
            assert!(Instant::now() < deadline, "global release never ran");
            thread::sleep(Duration::from_millis(1));
        }
    }
}
