//! Signal module: Completion and backpressure between producer and consumer.
//!
//! - [`CompletionSignal`]: one-shot signal carried by a batch
//! - [`CompletionWaiter`]: blocks the producer until the signal fires
//! - [`BackpressureGate`]: bounds the number of outstanding armed batches

mod completion;
mod gate;

pub use completion::{completion_pair, CompletionSignal, CompletionWaiter};
pub use gate::{BackpressureGate, BackpressureLevel, GateConfig};
