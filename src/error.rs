use thiserror::Error;

/// Discriminant for an [`EvalError`], so callers can branch on error class
/// without matching on the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    LexError,
    ParseError,
    UnknownFunction,
    ArityError,
    ArgumentError,
}

/// A single error type for the whole formula pipeline: lexing, parsing,
/// dispatch and argument validation all raise this with a human-readable
/// message and a [`EvalErrorKind`] discriminant.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        EvalError {
            kind,
            message: message.into(),
        }
    }

    pub fn lex(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::LexError, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::ParseError, message)
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownFunction,
            format!("unknown function {}", name),
        )
    }

    pub fn arity(name: &str, expected: &str, got: usize) -> Self {
        Self::new(
            EvalErrorKind::ArityError,
            format!("{} expects {} argument(s), got {}", name, expected, got),
        )
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::ArgumentError, message)
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
