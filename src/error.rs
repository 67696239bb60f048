use std::{borrow::Cow, fmt};

pub type CffResult<T> = Result<T, CffError>;

#[derive(Debug, Clone, PartialEq)]
pub enum CffError {
    /// The buffer ended in the middle of a read
    TruncatedInput,

    /// Bad offset size or decreasing offsets in an INDEX
    InvalidIndex(Cow<'static, str>),

    /// Byte 255 in a DICT, or operands that don't fit the operator's schema
    InvalidDictOperand(Cow<'static, str>),

    /// A structurally required piece of the font is missing or inconsistent
    MalformedFont(Cow<'static, str>),

    /// Unrecognized charset, encoding or FDSelect format byte
    UnsupportedFormat { table: &'static str, format: u8 },

    /// Charstring operand stack underflow
    StackUnderflow,

    /// Charstring operand stack overflow
    StackOverflow,

    /// The compiler was handed a value it would itself reject
    InvalidArgument(Cow<'static, str>),
}

impl fmt::Display for CffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedInput => write!(f, "unexpected eof"),
            Self::InvalidIndex(msg) => write!(f, "invalid INDEX: {}", msg),
            Self::InvalidDictOperand(msg) => write!(f, "invalid DICT operand: {}", msg),
            Self::MalformedFont(msg) => write!(f, "malformed font: {}", msg),
            Self::UnsupportedFormat { table, format } => {
                write!(f, "unsupported {} format: {}", table, format)
            }
            Self::StackUnderflow => write!(f, "stack underflow"),
            Self::StackOverflow => write!(f, "stack overflow"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for CffError {}
