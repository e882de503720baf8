//! Character-level formula scanner.
//!
//! The scanner walks the formula once, switching between a handful of
//! mutually exclusive modes (quoted text, quoted sheet path, bracketed range
//! offset, error literal, number). Outside those modes single characters are
//! matched against a fixed rule list. The raw token list is then handed to the
//! cleanup passes in [`crate::cleanup`].

use gridform_common::{ErrorNode, LanguageTable};

use crate::cleanup;
use crate::token::{ARRAY, ARRAY_ROW, SubType, Token, TokenType};

static ERROR_CODES: &[&str] = &[
    "#NULL!", "#DIV/0!", "#VALUE!", "#REF!", "#NAME?", "#NUM!", "#N/A",
];

/// Scanner state. Only one of these is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Inside `"..."`.
    Text,
    /// Inside `'...'`.
    Path,
    /// Inside `[...]`; the payload is the bracket depth.
    Range(u32),
    /// After `#`; the payload is where the `#` sits in the buffer.
    Error(usize),
    Number,
}

/// An entry on the bracket-matching stack.
#[derive(Debug, Clone)]
enum Opener {
    /// `(` of a function call or sub-expression.
    Bracket(Token),
    /// `{`, at this offset.
    Array(usize),
    /// A row inside `{...}`; the payload is the offset of its `{`.
    ArrayRow(usize),
}

/// Tokenize `formula` using the given locale table.
///
/// Never fails: malformed input yields a best-effort token sequence. Use
/// [`tokenize_strict`] to reject unterminated strings, paths, brackets and
/// error literals.
pub fn tokenize(formula: &str, table: &LanguageTable) -> Vec<Token> {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!("tokenize", len = formula.len()).entered();

    let (raw, _) = Tokenizer::new(formula, table).run();
    cleanup::apply(raw, table)
}

/// Like [`tokenize`], but returns a `Lex` error for input that ends inside a
/// quoted string, sheet path, bracket or error literal, and for unbalanced
/// brackets.
pub fn tokenize_strict(formula: &str, table: &LanguageTable) -> Result<Vec<Token>, ErrorNode> {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!("tokenize_strict", len = formula.len()).entered();

    let (raw, issue) = Tokenizer::new(formula, table).run();
    match issue {
        Some(err) => Err(err),
        None => Ok(cleanup::apply(raw, table)),
    }
}

/// Byte offset where scanning starts: leading spaces and one `=` are skipped.
pub fn body_offset(formula: &str) -> usize {
    let trimmed = formula.trim_start_matches(' ');
    let skipped = formula.len() - trimmed.len();
    if trimmed.starts_with('=') {
        skipped + 1
    } else {
        skipped
    }
}

struct Tokenizer<'a> {
    formula: &'a str,
    table: &'a LanguageTable,
    items: Vec<Token>,
    token_stack: Vec<Opener>,
    offset: usize,
    buffer: String,
    buffer_start: usize,
    mode: Mode,
    issue: Option<ErrorNode>,
}

impl<'a> Tokenizer<'a> {
    fn new(formula: &'a str, table: &'a LanguageTable) -> Self {
        Tokenizer {
            formula,
            table,
            items: Vec::with_capacity(formula.len() / 2),
            token_stack: Vec::with_capacity(8),
            offset: body_offset(formula),
            buffer: String::new(),
            buffer_start: 0,
            mode: Mode::Normal,
            issue: None,
        }
    }

    fn run(mut self) -> (Vec<Token>, Option<ErrorNode>) {
        while let Some(c) = self.current() {
            match self.mode {
                Mode::Text => self.scan_text(c),
                Mode::Path => self.scan_path(c),
                Mode::Range(depth) => self.scan_range(c, depth),
                Mode::Error(at) => self.scan_error(c, at),
                Mode::Number => {
                    if !self.scan_number(c) {
                        self.mode = Mode::Normal;
                        self.scan_normal(c);
                    }
                }
                Mode::Normal => self.scan_normal(c),
            }
        }
        self.finish();
        (self.items, self.issue)
    }

    #[inline]
    fn current(&self) -> Option<char> {
        self.formula[self.offset..].chars().next()
    }

    #[inline]
    fn char_at(&self, at: usize) -> Option<char> {
        self.formula.get(at..)?.chars().next()
    }

    #[inline]
    fn advance(&mut self, c: char) {
        self.offset += c.len_utf8();
    }

    fn note_issue(&mut self, message: String) {
        if self.issue.is_none() {
            self.issue = Some(ErrorNode::lex(message));
        }
    }

    /// Append `c` to the buffer, opening the buffer span if needed.
    fn accumulate(&mut self, c: char) {
        if self.buffer.is_empty() {
            self.buffer_start = self.offset;
        }
        self.buffer.push(c);
        self.advance(c);
    }

    fn push(
        &mut self,
        value: &str,
        token_type: TokenType,
        subtype: SubType,
        start: usize,
        end: usize,
    ) {
        self.items
            .push(Token::new_with_span(value, token_type, subtype, start, end));
    }

    /// Emit the buffer (if any) with the given classification.
    fn flush_as(&mut self, token_type: TokenType, subtype: SubType) {
        if self.buffer.is_empty() {
            return;
        }
        let value = std::mem::take(&mut self.buffer);
        self.items.push(Token::new_with_span(
            value,
            token_type,
            subtype,
            self.buffer_start,
            self.offset,
        ));
    }

    fn flush_operand(&mut self) {
        self.flush_as(TokenType::Operand, SubType::Unspecified);
    }

    /// True when argument separators belong to the innermost opener.
    fn inside_function(&self) -> bool {
        match self.token_stack.last() {
            Some(Opener::Bracket(t)) => t.token_type == TokenType::Function,
            Some(Opener::ArrayRow(_)) => true,
            Some(Opener::Array(_)) | None => false,
        }
    }

    fn inside_array_row(&self) -> bool {
        matches!(self.token_stack.last(), Some(Opener::ArrayRow(_)))
    }

    fn pop_bracket(&mut self) -> Option<Token> {
        match self.token_stack.pop() {
            Some(Opener::Bracket(t)) => Some(t),
            Some(other) => {
                self.token_stack.push(other);
                None
            }
            None => None,
        }
    }

    fn open_array_row(&mut self, array_at: usize, at: usize) {
        self.push(ARRAY_ROW, TokenType::Function, SubType::Start, at, at);
        self.token_stack.push(Opener::ArrayRow(array_at));
    }

    fn close_array_part(&mut self, at: usize, width: usize) {
        self.push("", TokenType::Function, SubType::Stop, at, at + width);
    }

    fn scan_text(&mut self, c: char) {
        if c != '"' {
            self.buffer.push(c);
            self.advance(c);
            return;
        }
        if self.char_at(self.offset + 1) == Some('"') {
            self.buffer.push('"');
            self.offset += 2;
            return;
        }
        self.offset += 1;
        self.mode = Mode::Normal;
        let value = std::mem::take(&mut self.buffer);
        let start = self.buffer_start;
        self.push(&value, TokenType::Operand, SubType::Text, start, self.offset);
    }

    fn scan_path(&mut self, c: char) {
        if c == '\'' {
            if self.char_at(self.offset + 1) == Some('\'') {
                self.buffer.push_str("''");
                self.offset += 2;
                return;
            }
            self.mode = Mode::Normal;
        }
        self.buffer.push(c);
        self.advance(c);
    }

    fn scan_range(&mut self, c: char, depth: u32) {
        self.mode = match c {
            '[' => Mode::Range(depth + 1),
            ']' if depth <= 1 => Mode::Normal,
            ']' => Mode::Range(depth - 1),
            _ => Mode::Range(depth),
        };
        self.buffer.push(c);
        self.advance(c);
    }

    fn scan_error(&mut self, c: char, at: usize) {
        self.buffer.push(c);
        self.advance(c);
        if ERROR_CODES.contains(&&self.buffer[at..]) {
            self.mode = Mode::Normal;
            self.flush_as(TokenType::Operand, SubType::Error);
        }
    }

    /// Returns false when `c` ends the number.
    fn scan_number(&mut self, c: char) -> bool {
        let decimal = self.table.decimal_separator;
        let has_exponent = self.buffer.contains(['E', 'e']);
        let accept = if c.is_ascii_digit() {
            true
        } else if c == decimal {
            !has_exponent && !self.buffer.contains(decimal)
        } else if c == 'E' || c == 'e' {
            !has_exponent
        } else if c == '+' || c == '-' {
            self.table.is_scientific_prefix(&self.buffer)
        } else {
            false
        };
        if accept {
            self.buffer.push(c);
            self.advance(c);
        }
        accept
    }

    /// A run of digits starting at the cursor that ends in `:` is a row
    /// reference (`1:3`), not a number.
    fn digit_run_precedes_colon(&self) -> bool {
        let rest = &self.formula.as_bytes()[self.offset..];
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        rest.get(digits) == Some(&b':')
    }

    fn scan_normal(&mut self, c: char) {
        let at = self.offset;

        if c == self.table.argument_separator
            && self.inside_function()
            && !(c == ';' && self.inside_array_row())
        {
            self.flush_operand();
            let sep = c.to_string();
            self.push(&sep, TokenType::Argument, SubType::Unspecified, at, at + 1);
            self.offset += 1;
            return;
        }

        if c == ',' {
            self.flush_operand();
            self.push(",", TokenType::OpInfix, SubType::Union, at, at + 1);
            self.offset += 1;
            return;
        }

        if c.is_ascii_digit() && self.buffer.is_empty() && !self.digit_run_precedes_colon() {
            self.mode = Mode::Number;
            self.accumulate(c);
            return;
        }

        match c {
            '"' => {
                self.flush_as(TokenType::Unknown, SubType::Unspecified);
                self.buffer_start = at;
                self.mode = Mode::Text;
                self.offset += 1;
            }
            '\'' => {
                self.accumulate(c);
                self.mode = Mode::Path;
            }
            '[' => {
                self.accumulate(c);
                self.mode = Mode::Range(1);
            }
            '#' => {
                if !self.buffer.ends_with('!') {
                    self.flush_as(TokenType::Unknown, SubType::Unspecified);
                }
                let hash_at = self.buffer.len();
                self.accumulate(c);
                self.mode = Mode::Error(hash_at);
            }
            '{' => {
                self.flush_as(TokenType::Unknown, SubType::Unspecified);
                self.push(ARRAY, TokenType::Function, SubType::Start, at, at + 1);
                self.token_stack.push(Opener::Array(at));
                self.open_array_row(at, at + 1);
                self.offset += 1;
            }
            ';' => {
                self.flush_operand();
                if let Some(&Opener::ArrayRow(array_at)) = self.token_stack.last() {
                    self.token_stack.pop();
                    self.close_array_part(at, 0);
                    self.push(";", TokenType::Argument, SubType::Unspecified, at, at + 1);
                    self.open_array_row(array_at, at + 1);
                } else {
                    self.note_issue(format!("Row separator outside an array at {at}"));
                    self.push(";", TokenType::Unknown, SubType::Unspecified, at, at + 1);
                }
                self.offset += 1;
            }
            '}' => {
                self.flush_operand();
                if self.inside_array_row() {
                    // A row always sits directly on its array.
                    self.token_stack.truncate(self.token_stack.len().saturating_sub(2));
                    self.close_array_part(at, 0);
                    self.close_array_part(at, 1);
                } else {
                    self.note_issue(format!("No array to close at {at}"));
                    self.push("}", TokenType::Unknown, SubType::Unspecified, at, at + 1);
                }
                self.offset += 1;
            }
            ' ' | '\n' => {
                self.flush_operand();
                while matches!(self.current(), Some(' ' | '\n')) {
                    self.offset += 1;
                }
                self.push(" ", TokenType::Whitespace, SubType::Unspecified, at, self.offset);
            }
            '>' | '<' if matches!(
                (c, self.char_at(at + 1)),
                ('>', Some('=')) | ('<', Some('=')) | ('<', Some('>'))
            ) =>
            {
                self.flush_operand();
                let formula = self.formula;
                let op = &formula[at..at + 2];
                self.push(op, TokenType::OpInfix, SubType::Logical, at, at + 2);
                self.offset += 2;
            }
            '+' | '-' | '*' | '/' | '^' | '&' | '=' | '>' | '<' => {
                self.flush_operand();
                let symbol = c.to_string();
                self.push(&symbol, TokenType::OpInfix, SubType::Unspecified, at, at + 1);
                self.offset += 1;
            }
            '%' => {
                self.flush_operand();
                self.push("%", TokenType::OpPostfix, SubType::Unspecified, at, at + 1);
                self.offset += 1;
            }
            '(' => {
                let opener = if self.buffer.is_empty() {
                    Token::new_with_span("", TokenType::Subexpr, SubType::Start, at, at + 1)
                } else {
                    let name = std::mem::take(&mut self.buffer);
                    let start = self.buffer_start;
                    Token::new_with_span(name, TokenType::Function, SubType::Start, start, at + 1)
                };
                self.items.push(opener.clone());
                self.token_stack.push(Opener::Bracket(opener));
                self.offset += 1;
            }
            ')' => {
                self.flush_operand();
                match self.pop_bracket() {
                    Some(opener) => self.items.push(opener.closer_at(at, 1)),
                    None => {
                        self.note_issue(format!("No matching opener for ')' at {at}"));
                        if self.inside_array_row() {
                            self.push(")", TokenType::Unknown, SubType::Unspecified, at, at + 1);
                        } else {
                            self.push("", TokenType::Subexpr, SubType::Stop, at, at + 1);
                        }
                    }
                }
                self.offset += 1;
            }
            _ => self.accumulate(c),
        }
    }

    fn finish(&mut self) {
        match self.mode {
            Mode::Text => {
                self.note_issue("Reached end of formula while parsing string".to_string());
                let value = std::mem::take(&mut self.buffer);
                let start = self.buffer_start;
                self.push(&value, TokenType::Operand, SubType::Text, start, self.offset);
            }
            Mode::Path => {
                self.note_issue("Reached end of formula while parsing sheet name".to_string());
                self.flush_operand();
            }
            Mode::Range(_) => {
                self.note_issue("Encountered unmatched '['".to_string());
                self.flush_operand();
            }
            Mode::Error(_) => {
                self.note_issue(format!("Invalid error code '{}'", self.buffer));
                self.flush_as(TokenType::Unknown, SubType::Unspecified);
            }
            Mode::Number | Mode::Normal => self.flush_operand(),
        }
        self.mode = Mode::Normal;

        let unmatched = match self.token_stack.last() {
            Some(Opener::Bracket(t)) if t.value.is_empty() => Some(("(".to_string(), t.start)),
            Some(Opener::Bracket(t)) => Some((t.value.clone(), t.start)),
            Some(Opener::Array(at) | Opener::ArrayRow(at)) => Some(("{".to_string(), *at)),
            None => None,
        };
        if let Some((what, at)) = unmatched {
            self.note_issue(format!("Unmatched opening '{what}' at {at}"));
        }
    }
}

/// Rebuild formula text (without the leading `=`) from a token sequence.
///
/// Re-tokenizing the result with the same table yields the same
/// `(type, subtype)` sequence.
pub fn render_tokens(tokens: &[Token], table: &LanguageTable) -> String {
    // What each open bracket prints when it closes.
    let mut closers: Vec<&str> = Vec::new();
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        match (token.token_type, token.subtype) {
            (TokenType::Function, SubType::Start) if token.is_array_row_start() => {
                closers.push("");
            }
            (TokenType::Function, SubType::Start)
                if token.value == ARRAY
                    && tokens.get(i + 1).is_some_and(Token::is_array_row_start) =>
            {
                out.push('{');
                closers.push("}");
            }
            (TokenType::Function, SubType::Start) => {
                out.push_str(&token.value);
                out.push('(');
                closers.push(")");
            }
            (TokenType::Subexpr, SubType::Start) => {
                out.push('(');
                closers.push(")");
            }
            (TokenType::Function | TokenType::Subexpr, SubType::Stop) => {
                out.push_str(closers.pop().unwrap_or(")"));
            }
            (TokenType::Operand, SubType::Text) => {
                out.push('"');
                out.push_str(&token.value.replace('"', "\"\""));
                out.push('"');
            }
            (TokenType::Operand, SubType::Number) if table.decimal_separator != '.' => {
                out.push_str(&token.value.replace('.', &table.decimal_separator.to_string()));
            }
            (TokenType::Operand, SubType::Logical) => out.push_str(if token.value == "TRUE" {
                table.true_literal
            } else {
                table.false_literal
            }),
            (TokenType::OpInfix, SubType::Intersect) | (TokenType::Whitespace, _) => out.push(' '),
            _ => out.push_str(&token.value),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridform_common::Locale;

    fn kinds(formula: &str) -> Vec<(TokenType, SubType, String)> {
        tokenize(formula, Locale::EnUs.table())
            .into_iter()
            .map(|t| (t.token_type, t.subtype, t.value))
            .collect()
    }

    fn op(value: &str, token_type: TokenType, subtype: SubType) -> (TokenType, SubType, String) {
        (token_type, subtype, value.to_string())
    }

    #[test]
    fn strips_leading_spaces_and_equals() {
        assert_eq!(body_offset("  =1"), 3);
        assert_eq!(body_offset("1"), 0);
        assert_eq!(kinds("  =1"), vec![op("1", TokenType::Operand, SubType::Number)]);
    }

    #[test]
    fn function_call_with_arguments() {
        use SubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("=SUM(A1:B2,3)*2%"),
            vec![
                op("SUM", Function, Start),
                op("A1:B2", Operand, Range),
                op(",", Argument, SubType::Unspecified),
                op("3", Operand, Number),
                op("", Function, Stop),
                op("*", OpInfix, Math),
                op("2", Operand, Number),
                op("%", OpPostfix, SubType::Unspecified),
            ]
        );
    }

    #[test]
    fn text_with_escaped_quotes() {
        let tokens = tokenize(r##"="say ""hi""""##, Locale::EnUs.table());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, r#"say "hi""#);
        assert_eq!(tokens[0].subtype, SubType::Text);
        assert_eq!((tokens[0].start, tokens[0].end), (1, 13));
    }

    #[test]
    fn quoted_sheet_name_stays_in_operand() {
        let tokens = tokenize("='My Sheet'!A1+1", Locale::EnUs.table());
        assert_eq!(tokens[0].value, "'My Sheet'!A1");
        assert_eq!(tokens[0].subtype, SubType::Range);
        assert_eq!(tokens[1].value, "+");
    }

    #[test]
    fn bracketed_range_joins_token() {
        let tokens = tokenize("=[Book1.xlsx]Sheet1!A1", Locale::EnUs.table());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "[Book1.xlsx]Sheet1!A1");
    }

    #[test]
    fn error_literals() {
        use SubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("=IF(#N/A,#DIV/0!)"),
            vec![
                op("IF", Function, Start),
                op("#N/A", Operand, Error),
                op(",", Argument, SubType::Unspecified),
                op("#DIV/0!", Operand, Error),
                op("", Function, Stop),
            ]
        );
        assert_eq!(kinds("=Sheet1!#REF!"), vec![op("Sheet1!#REF!", Operand, Error)]);
    }

    #[test]
    fn scientific_notation_keeps_sign() {
        use SubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("=1.5E-3+2"),
            vec![op("1.5E-3", Operand, Number), op("+", OpInfix, Math), op("2", Operand, Number)]
        );
        assert_eq!(
            kinds("=A1E-3"),
            vec![op("A1E", Operand, Range), op("-", OpInfix, Math), op("3", Operand, Number)]
        );
    }

    #[test]
    fn row_range_digits_are_not_numbers() {
        assert_eq!(kinds("=1:3"), vec![op("1:3", TokenType::Operand, SubType::Range)]);
    }

    #[test]
    fn comparison_operators() {
        use SubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("=A1<>B1"),
            vec![op("A1", Operand, Range), op("<>", OpInfix, Logical), op("B1", Operand, Range)]
        );
        assert_eq!(kinds("=1>2")[1], op(">", OpInfix, Logical));
        assert_eq!(kinds("=1>=2")[1], op(">=", OpInfix, Logical));
        assert_eq!(kinds("=\"a\"&\"b\"")[1], op("&", OpInfix, Concat));
    }

    #[test]
    fn unary_minus_and_plus() {
        use SubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("=-1*-(2)"),
            vec![
                op("-", OpPrefix, SubType::Unspecified),
                op("1", Operand, Number),
                op("*", OpInfix, Math),
                op("-", OpPrefix, SubType::Unspecified),
                op("", Subexpr, Start),
                op("2", Operand, Number),
                op("", Subexpr, Stop),
            ]
        );
        assert_eq!(kinds("=+1"), vec![op("1", Operand, Number)]);
        assert_eq!(kinds("=(+A1)")[1], op("A1", Operand, Range));
    }

    #[test]
    fn array_literal() {
        use SubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("={1,2;3,4}"),
            vec![
                op("ARRAY", Function, Start),
                op("ARRAYROW", Function, Start),
                op("1", Operand, Number),
                op(",", Argument, SubType::Unspecified),
                op("2", Operand, Number),
                op("", Function, Stop),
                op(";", Argument, SubType::Unspecified),
                op("ARRAYROW", Function, Start),
                op("3", Operand, Number),
                op(",", Argument, SubType::Unspecified),
                op("4", Operand, Number),
                op("", Function, Stop),
                op("", Function, Stop),
            ]
        );
    }

    #[test]
    fn functions_named_like_array_wrappers_are_plain_calls() {
        use SubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("=ARRAY(1)"),
            vec![op("ARRAY", Function, Start), op("1", Operand, Number), op("", Function, Stop)]
        );
        assert_eq!(
            kinds("=LET(x,1,ARRAY(x))")[5..],
            [
                op("ARRAY", Function, Start),
                op("x", Operand, Range),
                op("", Function, Stop),
                op("", Function, Stop),
            ]
        );

        let de: Vec<_> = tokenize("=ARRAYROW(1;2)", Locale::DeDe.table())
            .into_iter()
            .map(|t| (t.token_type, t.subtype, t.value))
            .collect();
        assert_eq!(
            de,
            vec![
                op("ARRAYROW", Function, Start),
                op("1", Operand, Number),
                op(";", Argument, SubType::Unspecified),
                op("2", Operand, Number),
                op("", Function, Stop),
            ]
        );
        assert!(tokenize_strict("=ARRAY(ARRAYROW(1))", Locale::EnUs.table()).is_ok());
    }

    #[test]
    fn every_start_has_a_stop_of_the_same_type() {
        for formula in ["=ARRAY(1)", "={ARRAY(1),2;3,4}", "=SUM((1),{1;2},ARRAYROW(3))"] {
            let mut open = Vec::new();
            for token in tokenize(formula, Locale::EnUs.table()) {
                if token.is_opener() {
                    open.push(token.token_type);
                } else if token.is_closer() {
                    assert_eq!(open.pop(), Some(token.token_type), "{formula}");
                }
            }
            assert!(open.is_empty(), "{formula}");
        }
    }

    #[test]
    fn union_outside_function() {
        use SubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("=(A1,B1)"),
            vec![
                op("", Subexpr, Start),
                op("A1", Operand, Range),
                op(",", OpInfix, Union),
                op("B1", Operand, Range),
                op("", Subexpr, Stop),
            ]
        );
    }

    #[test]
    fn de_de_separators_and_literals() {
        use SubType::*;
        use TokenType::*;
        let tokens: Vec<_> = tokenize("=SUMME(1,5;WAHR)", Locale::DeDe.table())
            .into_iter()
            .map(|t| (t.token_type, t.subtype, t.value))
            .collect();
        assert_eq!(
            tokens,
            vec![
                op("SUMME", Function, Start),
                op("1.5", Operand, Number),
                op(";", Argument, SubType::Unspecified),
                op("TRUE", Operand, Logical),
                op("", Function, Stop),
            ]
        );
    }

    #[test]
    fn at_prefix_is_stripped_from_functions() {
        let tokens = tokenize("=@SUM(1)", Locale::EnUs.table());
        assert_eq!(tokens[0].value, "SUM");
        assert_eq!(tokens[0].token_type, TokenType::Function);
    }

    #[test]
    fn spans_cover_source_text() {
        let formula = "=abs(A1) + 2";
        let tokens = tokenize(formula, Locale::EnUs.table());
        let spans: Vec<_> = tokens.iter().map(|t| &formula[t.start..t.end]).collect();
        assert_eq!(spans, vec!["abs(", "A1", ")", "+", "2"]);
    }

    #[test]
    fn unterminated_input_is_permissive() {
        let tokens = tokenize("=\"abc", Locale::EnUs.table());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "abc");
        assert_eq!(tokens[0].subtype, SubType::Text);

        assert!(!tokenize("=SUM(1", Locale::EnUs.table()).is_empty());
        assert!(!tokenize("=1)", Locale::EnUs.table()).is_empty());
    }

    #[test]
    fn strict_mode_reports_lex_errors() {
        let t = Locale::EnUs.table();
        for formula in ["=\"abc", "='Sheet", "=[Book", "=#BAD", "=SUM(1", "=1)", "={1,2"] {
            let err = tokenize_strict(formula, t).unwrap_err();
            assert!(err.is_lex(), "{formula}: {err}");
        }
        assert!(tokenize_strict("=SUM(1,2)", t).is_ok());
    }

    #[test]
    fn render_rebuilds_formula_text() {
        let t = Locale::EnUs.table();
        let tokens = tokenize("=SUM({1,2;3,4}) & \"a\"\"b\" + 'S 1'!A1 B2", t);
        assert_eq!(render_tokens(&tokens, t), "SUM({1,2;3,4})&\"a\"\"b\"+'S 1'!A1 B2");

        let de = Locale::DeDe.table();
        let tokens = tokenize("=WENN(WAHR;1,5;0)", de);
        assert_eq!(render_tokens(&tokens, de), "WENN(WAHR;1,5;0)");

        let tokens = tokenize("=ARRAY(1)+{ARRAYROW(2)}", t);
        assert_eq!(render_tokens(&tokens, t), "ARRAY(1)+{ARRAYROW(2)}");
    }
}
