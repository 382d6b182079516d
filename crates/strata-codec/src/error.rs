use thiserror::Error;

/// Errors produced while encoding or decoding a tagged stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("unknown type tag {0:#04x}")]
    UnknownTag(u8),

    #[error("unexpected type tag: expected {expected}, found {found}")]
    UnexpectedTag {
        expected: &'static str,
        found: &'static str,
    },

    #[error("type name mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("field count mismatch for {name}: expected {expected}, found {found}")]
    FieldCount {
        name: String,
        expected: u64,
        found: u64,
    },

    #[error("invalid UTF-8 string: {0}")]
    InvalidUtf8(String),

    #[error("{0} trailing bytes inside a length-delimited field")]
    TrailingBytes(usize),

    #[error("declared length {0} exceeds addressable memory")]
    LengthOverflow(u64),

    #[error("invalid {entity}: {reason}")]
    Invalid {
        entity: &'static str,
        reason: String,
    },
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
