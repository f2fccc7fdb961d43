//! Batch module: What travels from the decoder thread to the interpreter.
//!
//! This module contains:
//! - [`TokenBatch`]: an owned, cursor-driven batch of tokens
//! - [`BatchGroup`]: consecutive batches coalesced into one stream
//! - [`ByteLengths`]: byte accounting behind executed batches

#[allow(clippy::module_inception)]
mod batch;
mod group;
mod lengths;

pub use batch::TokenBatch;
pub use group::BatchGroup;
pub use lengths::ByteLengths;
