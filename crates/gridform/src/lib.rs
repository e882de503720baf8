//! Meta crate that re-exports the gridform building blocks. Depend on this
//! crate for the common path (`parse`, `tokenize`, `cursor_context`) and reach
//! into [`common`] or [`parse`] for everything else.

pub use gridform_common as common;
pub use gridform_parse as parse;

pub use gridform_common::{ErrorKind, ErrorNode, LanguageTable, Locale};
pub use gridform_parse::{
    CursorContext, DisplayUnit, FormulaNode, ParseOptions, Token, cursor_context, display_units,
    parse_with_options, render_tokens, tokenize, tokenize_strict,
};

/// Tokenize and parse `formula` in `locale`.
pub fn parse_formula(formula: &str, locale: Locale) -> Result<FormulaNode, ErrorNode> {
    gridform_parse::parse(formula, locale)
}
