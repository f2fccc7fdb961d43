//! Token: A single decoded unit of terminal output.

use super::TokenKind;

/// Carriage return.
pub const CR: u8 = b'\r';
/// Line feed.
pub const LF: u8 = b'\n';

/// A decoded token.
///
/// Only [`kind`](Self::kind) and the leading byte matter to this crate. The
/// decoder `code`, the raw `bytes` and any nested `children` are carried
/// through untouched for the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    /// Decoder-assigned type code; opaque here.
    code: u16,
    /// Input bytes (or text payload) of this token.
    bytes: Vec<u8>,
    /// Nested tokens of a [`TokenKind::Group`].
    children: Vec<Token>,
}

impl Token {
    /// Create a token of an arbitrary kind.
    pub const fn new(kind: TokenKind, code: u16, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            code,
            bytes,
            children: Vec::new(),
        }
    }

    /// A run of printable ASCII.
    pub fn ascii_run(text: impl Into<Vec<u8>>) -> Self {
        let bytes = text.into();
        debug_assert!(bytes.is_ascii(), "ascii run with non-ascii bytes");
        Self::new(TokenKind::AsciiRun, 0, bytes)
    }

    /// An ASCII run ending in CR/LF.
    pub fn mixed_run(text: impl Into<Vec<u8>>) -> Self {
        Self::new(TokenKind::MixedAsciiControlRun, 0, text.into())
    }

    /// A single control character.
    pub fn control_char(byte: u8) -> Self {
        Self::new(TokenKind::ControlChar, u16::from(byte), vec![byte])
    }

    /// A group of tokens already known to be transparent.
    pub fn group(children: Vec<Self>) -> Self {
        Self {
            kind: TokenKind::Group,
            code: 0,
            bytes: Vec::new(),
            children,
        }
    }

    /// An opaque token, e.g. an escape sequence.
    pub fn other(code: u16, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(TokenKind::Other, code, bytes.into())
    }

    /// The coalescing kind.
    #[inline]
    pub const fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The decoder type code.
    #[inline]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// The token's bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Nested tokens (empty unless this is a group).
    #[inline]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// The first byte of the token, if any.
    #[inline]
    pub fn first_byte(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// Whether this is a control-char token holding a lone CR.
    #[inline]
    pub fn is_bare_carriage_return(&self) -> bool {
        self.kind == TokenKind::ControlChar && self.bytes == [CR]
    }

    /// Whether this is a CR/LF-terminated run starting with CR.
    #[inline]
    pub fn starts_with_carriage_return(&self) -> bool {
        self.kind == TokenKind::MixedAsciiControlRun && self.first_byte() == Some(CR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_carriage_return() {
        assert!(Token::control_char(CR).is_bare_carriage_return());
        assert!(!Token::control_char(LF).is_bare_carriage_return());
        assert!(!Token::ascii_run("\r").is_bare_carriage_return());
    }

    #[test]
    fn test_starts_with_carriage_return() {
        assert!(Token::mixed_run(b"\r\n".to_vec()).starts_with_carriage_return());
        assert!(!Token::mixed_run(b"ab\r\n".to_vec()).starts_with_carriage_return());
        assert!(!Token::other(7, b"\r".to_vec()).starts_with_carriage_return());
    }

    #[test]
    fn test_group_children() {
        let group = Token::group(vec![
            Token::ascii_run("ab"),
            Token::group(vec![Token::mixed_run("c\r\n")]),
        ]);
        assert_eq!(group.kind(), TokenKind::Group);
        assert_eq!(group.children().len(), 2);
        assert_eq!(group.children()[1].children().len(), 1);
    }

    #[test]
    fn test_control_char_code() {
        let token = Token::control_char(0x07);
        assert_eq!(token.code(), 7);
        assert_eq!(token.bytes(), &[0x07]);
    }
}
