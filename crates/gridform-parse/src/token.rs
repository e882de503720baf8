use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name of the synthetic function wrapping an array literal.
pub const ARRAY: &str = "ARRAY";
/// Name of the synthetic function wrapping one row of an array literal.
pub const ARRAY_ROW: &str = "ARRAYROW";

/// The type of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TokenType {
    #[default]
    Unspecified,
    Noop,
    Operand,
    Function,
    Subexpr,
    Argument,
    OpPrefix,
    OpInfix,
    OpPostfix,
    Whitespace,
    Unknown,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The subtype of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SubType {
    #[default]
    Unspecified,
    Start,
    Stop,
    Text,
    Number,
    Logical,
    Error,
    Range,
    Math,
    Concat,
    Intersect,
    Union,
}

impl Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A classified slice of a formula.
///
/// `start`/`end` are byte offsets into the text handed to the tokenizer.
/// Tokens are plain values: the cleanup passes rebuild them through the
/// `with_*` methods instead of mutating them behind a shared handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Token {
    pub value: String,
    pub token_type: TokenType,
    pub subtype: SubType,
    pub start: usize,
    pub end: usize,
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} subtype: {:?} value: {}>",
            self.token_type, self.subtype, self.value
        )
    }
}

impl Token {
    pub fn new<S: Into<String>>(value: S, token_type: TokenType, subtype: SubType) -> Self {
        Token {
            value: value.into(),
            token_type,
            subtype,
            start: 0,
            end: 0,
        }
    }

    pub fn new_with_span<S: Into<String>>(
        value: S,
        token_type: TokenType,
        subtype: SubType,
        start: usize,
        end: usize,
    ) -> Self {
        Token {
            value: value.into(),
            token_type,
            subtype,
            start,
            end,
        }
    }

    pub fn with_type(self, token_type: TokenType) -> Self {
        Token { token_type, ..self }
    }

    pub fn with_subtype(self, subtype: SubType) -> Self {
        Token { subtype, ..self }
    }

    pub fn with_value<S: Into<String>>(self, value: S) -> Self {
        Token {
            value: value.into(),
            ..self
        }
    }

    #[inline]
    pub fn is(&self, token_type: TokenType, subtype: SubType) -> bool {
        self.token_type == token_type && self.subtype == subtype
    }

    /// `Function` or `Subexpr` start.
    pub fn is_opener(&self) -> bool {
        matches!(self.token_type, TokenType::Function | TokenType::Subexpr)
            && self.subtype == SubType::Start
    }

    /// `Function` or `Subexpr` stop.
    pub fn is_closer(&self) -> bool {
        matches!(self.token_type, TokenType::Function | TokenType::Subexpr)
            && self.subtype == SubType::Stop
    }

    /// The row opener synthesized inside `{...}`. It covers no source text,
    /// which tells it apart from a call written as `ARRAYROW(`.
    pub fn is_array_row_start(&self) -> bool {
        self.is(TokenType::Function, SubType::Start)
            && self.value == ARRAY_ROW
            && self.start == self.end
    }

    /// Build the `Stop` token that closes this opener, positioned at `at`.
    pub(crate) fn closer_at(&self, at: usize, width: usize) -> Token {
        Token::new_with_span("", self.token_type, SubType::Stop, at, at + width)
    }
}
