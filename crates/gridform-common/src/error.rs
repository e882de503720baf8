//! The error channel used by every fallible stage of the formula pipeline.
//!
//! - **`ErrorKind`** : which stage rejected the input (`Lex` or `Unspecified`)
//! - **`ErrorNode`** : the kind plus a human readable message
//!
//! An `ErrorNode` is built once at the point of failure and handed back up the
//! call chain untouched. Callers must treat any `ErrorNode` as "the whole parse
//! failed"; there is never a partial tree alongside it.

use std::fmt;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Message used for every structural syntax failure.
pub const INVALID_SYNTAX: &str = "Invalid Syntax";

/// Which stage produced an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ErrorKind {
    /// Syntax failures: a stalled parse, consuming past the end of the token
    /// stream, an unsupported operator.
    #[default]
    Unspecified,
    /// Lexical failures such as an unterminated string. Only produced when
    /// strict lexing is requested.
    Lex,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unspecified => "syntax",
            Self::Lex => "lex",
        })
    }
}

/// A failed tokenize or parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[error("{kind} error: {message}")]
pub struct ErrorNode {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorNode {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// An `Unspecified` error with the given message.
    pub fn syntax<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Unspecified, message)
    }

    /// The canonical `Invalid Syntax` error.
    pub fn invalid_syntax() -> Self {
        Self::syntax(INVALID_SYNTAX)
    }

    pub fn lex<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Lex, message)
    }

    pub fn is_lex(&self) -> bool {
        self.kind == ErrorKind::Lex
    }
}

impl PartialEq<str> for ErrorNode {
    fn eq(&self, other: &str) -> bool {
        self.message == other
    }
}

impl PartialEq<&str> for ErrorNode {
    fn eq(&self, other: &&str) -> bool {
        self.message == *other
    }
}
