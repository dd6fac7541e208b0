use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Failure to read a binding attribute; every variant carries the byte offset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Attribute ends early at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Unrecognized character at {pos}")]
    LexerError { pos: usize },

    #[error("Number '{literal}' at {pos} is out of range")]
    InvalidNumber { pos: usize, literal: String },

    #[error("Invalid escape '{escape}' in string at {pos}")]
    InvalidEscape { pos: usize, escape: String },
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    pub fn invalid_number(pos: usize, literal: impl Into<String>) -> Self {
        Self::InvalidNumber {
            pos,
            literal: literal.into(),
        }
    }

    pub fn invalid_escape(pos: usize, escape: impl Into<String>) -> Self {
        Self::InvalidEscape {
            pos,
            escape: escape.into(),
        }
    }

    /// Byte offset into the attribute source
    pub fn pos(&self) -> usize {
        match self {
            Self::UnexpectedToken { pos, .. }
            | Self::UnexpectedEof { pos }
            | Self::LexerError { pos }
            | Self::InvalidNumber { pos, .. }
            | Self::InvalidEscape { pos, .. } => *pos,
        }
    }
}
