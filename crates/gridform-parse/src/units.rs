//! Cursor lookup for formula editors.
//!
//! A display unit is the smallest piece of formula text an editor highlights
//! or places a cursor against. Units follow tokens, except that a function
//! start is split into its name and its `(`, and the leading `=` gets a unit
//! of its own.

use gridform_common::LanguageTable;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::token::{SubType, TokenType};
use crate::tokenizer::{body_offset, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnitKind {
    Equals,
    FunctionName,
    Open,
    Close,
    Separator,
    Operator,
    Operand,
    Unknown,
}

/// One highlightable span of the source formula.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayUnit {
    pub text: String,
    pub kind: UnitKind,
    /// Byte offsets into the formula.
    pub start: usize,
    pub end: usize,
    /// Index of the token this unit came from; `None` for the leading `=`.
    pub token_index: Option<usize>,
}

/// Split `formula` into display units, in source order.
///
/// Dropped whitespace and the synthetic array row markers produce no units.
pub fn display_units(formula: &str, table: &LanguageTable) -> Vec<DisplayUnit> {
    let tokens = tokenize(formula, table);
    let mut units = Vec::with_capacity(tokens.len() + 2);

    let body = body_offset(formula);
    if body > 0 && formula[..body].ends_with('=') {
        units.push(DisplayUnit {
            text: "=".to_string(),
            kind: UnitKind::Equals,
            start: body - 1,
            end: body,
            token_index: None,
        });
    }

    for (index, token) in tokens.iter().enumerate() {
        // Synthetic array row markers and row closers have empty spans.
        if token.start == token.end {
            continue;
        }
        let source = &formula[token.start..token.end];
        let mut unit = |text: &str, kind: UnitKind, start: usize, end: usize| {
            units.push(DisplayUnit {
                text: text.to_string(),
                kind,
                start,
                end,
                token_index: Some(index),
            });
        };

        match (token.token_type, token.subtype) {
            (TokenType::Function, SubType::Start) if source.ends_with('(') => {
                let paren = token.end - 1;
                unit(&source[..source.len() - 1], UnitKind::FunctionName, token.start, paren);
                unit("(", UnitKind::Open, paren, token.end);
            }
            (TokenType::Function | TokenType::Subexpr, SubType::Start) => {
                unit(source, UnitKind::Open, token.start, token.end)
            }
            (TokenType::Function | TokenType::Subexpr, SubType::Stop) => {
                unit(source, UnitKind::Close, token.start, token.end)
            }
            (TokenType::Argument, _) => unit(source, UnitKind::Separator, token.start, token.end),
            (TokenType::OpPrefix | TokenType::OpInfix | TokenType::OpPostfix, _) => {
                unit(source, UnitKind::Operator, token.start, token.end)
            }
            (TokenType::Operand, _) => unit(source, UnitKind::Operand, token.start, token.end),
            _ => unit(source, UnitKind::Unknown, token.start, token.end),
        }
    }
    units
}

/// Index of the unit a cursor at byte `offset` sits against.
///
/// A cursor belongs to the unit it directly follows (`start < offset <= end`);
/// offset 0 maps to the first unit. Returns `None` when the cursor is in a gap
/// such as dropped whitespace.
pub fn unit_index_at(units: &[DisplayUnit], offset: usize) -> Option<usize> {
    if offset == 0 {
        return if units.is_empty() { None } else { Some(0) };
    }
    units
        .iter()
        .position(|u| u.start < offset && offset <= u.end)
}

/// What an autocomplete trigger needs to know about a cursor position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CursorContext {
    pub unit_index: Option<usize>,
    /// Innermost function whose argument list contains the cursor.
    pub function: Option<String>,
    /// Zero-based argument of `function` the cursor is in.
    pub argument_index: usize,
}

pub fn cursor_context(formula: &str, table: &LanguageTable, offset: usize) -> CursorContext {
    let units = display_units(formula, table);
    let tokens = tokenize(formula, table);

    // One frame per open bracket left of the cursor: (function name, argument).
    let mut frames: Vec<(Option<&str>, usize)> = Vec::new();
    for token in tokens.iter().take_while(|t| t.end <= offset) {
        match (token.token_type, token.subtype) {
            (TokenType::Function, SubType::Start) => frames.push((Some(token.value.as_str()), 0)),
            (TokenType::Subexpr, SubType::Start) => frames.push((None, 0)),
            (TokenType::Function | TokenType::Subexpr, SubType::Stop) => {
                frames.pop();
            }
            (TokenType::Argument, _) => {
                if let Some(frame) = frames.last_mut() {
                    frame.1 += 1;
                }
            }
            _ => {}
        }
    }

    let enclosing = frames.iter().rev().find_map(|(name, arg)| name.map(|n| (n, *arg)));
    CursorContext {
        unit_index: unit_index_at(&units, offset),
        function: enclosing.map(|(name, _)| name.to_string()),
        argument_index: enclosing.map_or(0, |(_, arg)| arg),
    }
}
