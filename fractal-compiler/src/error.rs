use std::fmt;
use std::ops::Range;

use crate::types::ValueType;

/// All errors produced by the fractal compiler.
#[derive(Debug)]
pub struct FractalError {
    pub kind: ErrorKind,
    pub span: Option<Range<usize>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Two operators registered under the same name.
    #[error("operator '{0}' is registered twice")]
    DuplicateOperator(String),
    /// No operator produces a value type, so generation could get stuck.
    #[error("no operator produces a {0} value")]
    MissingOperator(ValueType),
    /// Operator template failed validation at registration.
    #[error("bad template for operator '{op}': {reason}")]
    BadTemplate { op: String, reason: String },
    /// Notation referenced an operator the registry doesn't know.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    /// An operator was applied to the wrong number of arguments.
    #[error("operator '{op}' takes {expected} argument(s), got {got}")]
    ArityMismatch { op: String, expected: usize, got: usize },
    /// An argument's type doesn't match the operator's input slot.
    #[error("{context}: expected {expected}, got {got}")]
    TypeMismatch {
        context: String,
        expected: ValueType,
        got: ValueType,
    },
    /// Lexer encountered an unrecognized character/sequence.
    #[error("unrecognized token: {0}")]
    UnrecognizedToken(String),
    /// Parser expected one thing, got another.
    #[error("expected {expected}, got {got}")]
    UnexpectedToken { expected: String, got: String },
    /// Parser reached end of input unexpectedly.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Rendering collaborator failure (shader compile, device, readback).
    #[error("backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl fmt::Display for FractalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(span) = &self.span {
            write!(f, " (at byte {}..{})", span.start, span.end)?;
        }

        Ok(())
    }
}

impl std::error::Error for FractalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e),
            ErrorKind::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ErrorKind> for FractalError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, span: None }
    }
}

impl From<std::io::Error> for FractalError {
    fn from(e: std::io::Error) -> Self {
        ErrorKind::Io(e).into()
    }
}

impl From<serde_json::Error> for FractalError {
    fn from(e: serde_json::Error) -> Self {
        ErrorKind::Json(e).into()
    }
}

pub type Result<T> = std::result::Result<T, FractalError>;

/// Shorthand constructors.
impl FractalError {
    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    pub fn unexpected_token(expected: &str, got: &str, span: Range<usize>) -> Self {
        Self {
            kind: ErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                got: got.to_string(),
            },
            span: Some(span),
        }
    }

    pub fn unexpected_eof(expected: &str) -> Self {
        ErrorKind::UnexpectedEof {
            expected: expected.to_string(),
        }
        .into()
    }

    pub fn unknown_operator(name: &str) -> Self {
        ErrorKind::UnknownOperator(name.to_string()).into()
    }

    pub fn bad_template(op: &str, reason: impl Into<String>) -> Self {
        ErrorKind::BadTemplate {
            op: op.to_string(),
            reason: reason.into(),
        }
        .into()
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ErrorKind::Config(msg.into()).into()
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        ErrorKind::Backend(msg.into()).into()
    }

    /// True for errors caused by a bad registry or config, i.e. startup errors.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::DuplicateOperator(_)
                | ErrorKind::MissingOperator(_)
                | ErrorKind::BadTemplate { .. }
                | ErrorKind::Config(_)
        )
    }
}
