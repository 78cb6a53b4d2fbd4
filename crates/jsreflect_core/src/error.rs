//! Error types for jsreflect.
//!
//! Every failure of a reflect call is reported exactly once, as the `Err` arm
//! of a [`ReflectResult`].  The variants fall into three disjoint classes,
//! exposed through [`ReflectError::kind`]:
//!
//! - [`ErrorKind::User`] — the source text (or the caller's configuration) is
//!   at fault: syntax errors, non-callable builder entries.
//! - [`ErrorKind::Internal`] — the parse tree handed to the serializer had a
//!   shape it does not understand.  Never the script author's fault.
//! - [`ErrorKind::Resource`] — recursion or allocation limits were hit.

use std::fmt;

use thiserror::Error;

/// All errors that can be produced while parsing and reflecting a script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReflectError {
    /// The source text is not a valid script, or a construct that is only
    /// legal in a pattern was used as an expression.
    #[error("SyntaxError: {message} (line {line}, column {column})")]
    SyntaxError {
        /// Human-readable description.
        message: String,
        /// 1-based line, already offset by the configured starting line.
        line: u32,
        /// 0-based column.
        column: u32,
    },

    /// A value of the wrong type was supplied by the caller (for example a
    /// non-callable builder entry).
    #[error("TypeError: {0}")]
    TypeError(String),

    /// The serializer met a parse node whose kind or arity it cannot handle.
    #[error("internal error: bad parse node: {0}")]
    BadParseNode(String),

    /// Recursion depth exceeded the configured limit.
    #[error("InternalError: too much recursion")]
    TooMuchRecursion,

    /// The allocation budget for the result graph was exhausted.
    #[error("out of memory")]
    OutOfMemory,

    /// An internal error that should not occur in normal operation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Classification of a [`ReflectError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caused by the source text or the caller's configuration.
    User,
    /// An internal-consistency violation in the parse tree.
    Internal,
    /// A recursion or allocation limit was reached.
    Resource,
}

impl ErrorKind {
    /// Numeric code used by the CLI exit status and the C ABI.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::User => 1,
            ErrorKind::Internal => 2,
            ErrorKind::Resource => 3,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::User => "user",
            ErrorKind::Internal => "internal",
            ErrorKind::Resource => "resource",
        })
    }
}

impl ReflectError {
    /// Build a [`ReflectError::SyntaxError`] at the given position.
    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        ReflectError::SyntaxError {
            message: message.into(),
            line,
            column,
        }
    }

    /// Build a [`ReflectError::BadParseNode`].
    pub fn bad_parse_node(message: impl Into<String>) -> Self {
        ReflectError::BadParseNode(message.into())
    }

    /// Which of the three error classes this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReflectError::SyntaxError { .. } | ReflectError::TypeError(_) => ErrorKind::User,
            ReflectError::BadParseNode(_) | ReflectError::Internal(_) => ErrorKind::Internal,
            ReflectError::TooMuchRecursion | ReflectError::OutOfMemory => ErrorKind::Resource,
        }
    }
}

/// Convenient `Result` alias for fallible reflect operations.
pub type ReflectResult<T> = Result<T, ReflectError>;
