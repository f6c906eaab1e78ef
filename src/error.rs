use thiserror::Error;

/// Resolver failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token index {index} out of bounds")]
    OutOfBounds { index: usize },
}

/// Malformed input while reading a binary node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input: needed {needed} bytes, {remaining} left")]
    UnexpectedEof { needed: usize, remaining: usize },
    #[error("invalid list tag {0}")]
    InvalidListTag(u8),
    #[error("invalid string tag {0}")]
    InvalidStringTag(u8),
    #[error("unexpected stream end")]
    UnexpectedStreamEnd,
    #[error("invalid node")]
    InvalidNode,
    #[error("invalid jid pair")]
    InvalidJid,
    #[error("invalid packed digit {digit:#x} under tag {tag}")]
    InvalidPackedDigit { tag: u8, digit: u8 },
    #[error("nesting deeper than {0}")]
    DepthExceeded(usize),
    #[error("{0} trailing bytes after node")]
    TrailingBytes(usize),
    #[error("string is not valid utf-8")]
    InvalidUtf8,
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Node that cannot be expressed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("node tag is empty")]
    EmptyTag,
    #[error("packed string of {0} chars exceeds limit")]
    PackedTooLong(usize),
    #[error("character {ch:?} cannot be packed under tag {tag}")]
    UnpackableChar { tag: u8, ch: char },
    #[error("list of {0} entries exceeds u16")]
    ListTooLong(usize),
    #[error("binary of {0} bytes exceeds u32")]
    BinaryTooLong(usize),
}
