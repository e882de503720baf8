pub mod ast;
pub mod cleanup;
pub mod operator;
pub mod parser;
pub mod stream;
pub mod token;
pub mod tokenizer;
pub mod units;

pub use ast::{CellRef, CellRefType, FormulaNode};
pub use parser::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_HEIGHT, ParseOptions, Parser, parse, parse_formula,
    parse_with_options,
};
pub use stream::TokenStream;
pub use token::{SubType, Token, TokenType};
pub use tokenizer::{body_offset, render_tokens, tokenize, tokenize_strict};
pub use units::{CursorContext, DisplayUnit, UnitKind, cursor_context, display_units, unit_index_at};

// Re-export common types
pub use gridform_common::{ErrorKind, ErrorNode, LanguageTable, Locale};
