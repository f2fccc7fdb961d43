//! Token kinds as seen by the coalescing logic.
//!
//! The decoder produces many more token types than are listed here. Every
//! type that is not one of the first four variants is reported as
//! [`TokenKind::Other`], which the coalescing rule treats as opaque and
//! possibly stateful.

use bitflags::bitflags;

/// The coalescing-relevant kind of a decoded token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A run of printable ASCII.
    AsciiRun,
    /// An ASCII run terminated by a CR/LF pair.
    MixedAsciiControlRun,
    /// A nested sequence already known to be transparent.
    Group,
    /// A single C0 control character, e.g. a bare carriage return.
    ControlChar,
    /// Anything else (escape sequences, unknown bytes, ...).
    Other,
}

impl TokenKind {
    /// The single-bit set for this kind.
    #[inline]
    pub const fn as_set(self) -> KindSet {
        match self {
            Self::AsciiRun => KindSet::ASCII_RUN,
            Self::MixedAsciiControlRun => KindSet::MIXED_ASCII_CONTROL_RUN,
            Self::Group => KindSet::GROUP,
            Self::ControlChar => KindSet::CONTROL_CHAR,
            Self::Other => KindSet::OTHER,
        }
    }

    /// Whether a token of this kind can sit next to a batch boundary
    /// without changing how the stream is interpreted.
    #[inline]
    pub const fn is_transparent(self) -> bool {
        KindSet::TRANSPARENT.contains(self.as_set())
    }
}

bitflags! {
    /// A set of [`TokenKind`]s.
    ///
    /// # Example
    /// ```
    /// use tokenbatch::{KindSet, TokenKind};
    /// assert!(KindSet::TRANSPARENT.contains(TokenKind::Group.as_set()));
    /// assert!(!KindSet::TRANSPARENT.contains(TokenKind::ControlChar.as_set()));
    /// ```
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KindSet: u8 {
        /// [`TokenKind::AsciiRun`]
        const ASCII_RUN = 0b0000_0001;
        /// [`TokenKind::MixedAsciiControlRun`]
        const MIXED_ASCII_CONTROL_RUN = 0b0000_0010;
        /// [`TokenKind::Group`]
        const GROUP = 0b0000_0100;
        /// [`TokenKind::ControlChar`]
        const CONTROL_CHAR = 0b0000_1000;
        /// [`TokenKind::Other`]
        const OTHER = 0b0001_0000;

        /// Kinds that never break coalescing.
        const TRANSPARENT = Self::ASCII_RUN.bits()
            | Self::MIXED_ASCII_CONTROL_RUN.bits()
            | Self::GROUP.bits();
    }
}

impl std::fmt::Debug for KindSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

impl From<TokenKind> for KindSet {
    #[inline]
    fn from(kind: TokenKind) -> Self {
        kind.as_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_kinds() {
        assert!(TokenKind::AsciiRun.is_transparent());
        assert!(TokenKind::MixedAsciiControlRun.is_transparent());
        assert!(TokenKind::Group.is_transparent());
        assert!(!TokenKind::ControlChar.is_transparent());
        assert!(!TokenKind::Other.is_transparent());
    }

    #[test]
    fn test_kind_set_union() {
        let set = KindSet::from(TokenKind::ControlChar) | TokenKind::Other.into();
        assert!(set.contains(KindSet::CONTROL_CHAR));
        assert!(set.contains(KindSet::OTHER));
        assert!(!set.intersects(KindSet::TRANSPARENT));
    }
}
