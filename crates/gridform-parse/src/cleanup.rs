//! Post-scan passes over the raw token list.
//!
//! Each pass consumes the list and returns a new one; tokens are rebuilt with
//! `Token::with_*` rather than edited through shared references.

use gridform_common::LanguageTable;

use crate::token::{SubType, Token, TokenType};

/// Run all passes in order: whitespace, reclassification, no-op removal.
pub fn apply(tokens: Vec<Token>, table: &LanguageTable) -> Vec<Token> {
    let tokens = prune_whitespace(tokens);
    let tokens = reclassify(tokens, table);
    drop_noops(tokens)
}

/// Things that may sit on the left of an intersection.
fn ends_operand(token: &Token) -> bool {
    token.is_closer() || token.token_type == TokenType::Operand
}

/// Things that may sit on the right of an intersection.
fn begins_operand(token: &Token) -> bool {
    token.is_opener() || token.token_type == TokenType::Operand
}

/// Drop insignificant whitespace. A space between two operand-like tokens is
/// the range intersection operator and becomes `OpInfix/Intersect`.
pub fn prune_whitespace(tokens: Vec<Token>) -> Vec<Token> {
    let last = tokens.len().saturating_sub(1);
    let mut out = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        if token.token_type != TokenType::Whitespace {
            out.push(token.clone());
            continue;
        }
        let keep = i > 0
            && i < last
            && ends_operand(&tokens[i - 1])
            && begins_operand(&tokens[i + 1]);
        if keep {
            out.push(
                token
                    .clone()
                    .with_type(TokenType::OpInfix)
                    .with_subtype(SubType::Intersect),
            );
        } else {
            #[cfg(feature = "tracing")]
            tracing::trace!(start = token.start, "dropping whitespace");
        }
    }
    out
}

/// True when a `+`/`-` at this point has a left operand, i.e. is binary.
fn follows_operand(previous: Option<&Token>) -> bool {
    previous.is_some_and(|p| {
        p.is_closer() || p.token_type == TokenType::OpPostfix || p.token_type == TokenType::Operand
    })
}

/// Assign subtypes: unary vs. binary `+`/`-`, operator families, operand
/// kinds. Numbers are rewritten to canonical `.` form and logicals to
/// `TRUE`/`FALSE`; a leading `@` is stripped from function names.
pub fn reclassify(tokens: Vec<Token>, table: &LanguageTable) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let binary = follows_operand(out.last());
        let token = match (token.token_type, token.subtype) {
            (TokenType::OpInfix, _) if token.value == "-" => {
                if binary {
                    token.with_subtype(SubType::Math)
                } else {
                    token.with_type(TokenType::OpPrefix)
                }
            }
            (TokenType::OpInfix, _) if token.value == "+" => {
                if binary {
                    token.with_subtype(SubType::Math)
                } else {
                    token.with_type(TokenType::Noop)
                }
            }
            (TokenType::OpInfix, SubType::Unspecified) => {
                let subtype = if token.value.starts_with(['<', '>', '=']) {
                    SubType::Logical
                } else if token.value == "&" {
                    SubType::Concat
                } else {
                    SubType::Math
                };
                token.with_subtype(subtype)
            }
            (TokenType::Operand, SubType::Unspecified) => classify_operand(token, table),
            (TokenType::Function, _) if token.value.starts_with('@') => {
                let name = token.value[1..].to_string();
                token.with_value(name)
            }
            _ => token,
        };
        out.push(token);
    }
    out
}

fn classify_operand(token: Token, table: &LanguageTable) -> Token {
    if table.parse_number(&token.value).is_some() {
        let canonical = table.reformat_number(&token.value).into_owned();
        return token.with_value(canonical).with_subtype(SubType::Number);
    }
    match table.parse_logical(&token.value) {
        Some(value) => token
            .with_value(if value { "TRUE" } else { "FALSE" })
            .with_subtype(SubType::Logical),
        None => token.with_subtype(SubType::Range),
    }
}

/// Remove redundant unary plus signs.
pub fn drop_noops(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|t| t.token_type != TokenType::Noop)
        .collect()
}
