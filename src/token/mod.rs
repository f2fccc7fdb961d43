//! Token module: The decoded units carried by a batch.
//!
//! - [`Token`]: an opaque decoded unit with a coalescing kind
//! - [`TokenKind`]: the kinds the coalescing rule distinguishes
//! - [`KindSet`]: bitflag sets of kinds

mod kind;
#[allow(clippy::module_inception)]
mod token;

pub use kind::{KindSet, TokenKind};
pub use token::{Token, CR, LF};
