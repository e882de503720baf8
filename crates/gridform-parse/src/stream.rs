use gridform_common::ErrorNode;

use crate::token::{SubType, Token, TokenType};

/// Read-only cursor over a finished token list.
///
/// One synthetic end token (`TokenType::Unspecified`) is appended so that
/// lookahead never runs out; consuming that end token is the stream's only
/// failure mode.
#[derive(Debug, Clone)]
pub struct TokenStream {
    items: Vec<Token>,
    position: usize,
}

impl TokenStream {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        let at = tokens.last().map_or(0, |t| t.end);
        tokens.push(Token::new_with_span(
            "",
            TokenType::Unspecified,
            SubType::Unspecified,
            at,
            at,
        ));
        TokenStream {
            items: tokens,
            position: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The token under the cursor; the end token once input is exhausted.
    #[inline]
    pub fn peek(&self) -> &Token {
        &self.items[self.position]
    }

    /// Number of real (non-synthetic) tokens.
    pub fn len(&self) -> usize {
        self.items.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance by one token.
    pub fn consume(&mut self) -> Result<(), ErrorNode> {
        if self.position + 1 >= self.items.len() {
            return Err(ErrorNode::invalid_syntax());
        }
        self.position += 1;
        Ok(())
    }

    #[inline]
    fn next_is(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    #[inline]
    fn next_is_sub(&self, token_type: TokenType, subtype: SubType) -> bool {
        self.peek().is(token_type, subtype)
    }

    pub fn next_is_end_of_stream(&self) -> bool {
        self.position + 1 == self.items.len()
    }

    pub fn next_is_number(&self) -> bool {
        self.next_is_sub(TokenType::Operand, SubType::Number)
    }

    pub fn next_is_text(&self) -> bool {
        self.next_is_sub(TokenType::Operand, SubType::Text)
    }

    pub fn next_is_logical(&self) -> bool {
        self.next_is_sub(TokenType::Operand, SubType::Logical)
    }

    pub fn next_is_range(&self) -> bool {
        self.next_is_sub(TokenType::Operand, SubType::Range)
    }

    pub fn next_is_error(&self) -> bool {
        self.next_is_sub(TokenType::Operand, SubType::Error)
    }

    pub fn next_is_unknown(&self) -> bool {
        self.next_is(TokenType::Unknown)
    }

    pub fn next_is_terminal(&self) -> bool {
        self.next_is_number()
            || self.next_is_text()
            || self.next_is_logical()
            || self.next_is_range()
    }

    pub fn next_is_open_paren(&self) -> bool {
        self.next_is_sub(TokenType::Subexpr, SubType::Start)
    }

    pub fn next_is_close_paren(&self) -> bool {
        self.next_is_sub(TokenType::Subexpr, SubType::Stop)
    }

    pub fn next_is_function_call(&self) -> bool {
        self.next_is_sub(TokenType::Function, SubType::Start)
    }

    pub fn next_is_end_of_function_call(&self) -> bool {
        self.next_is_sub(TokenType::Function, SubType::Stop)
    }

    pub fn next_is_argument_separator(&self) -> bool {
        self.next_is(TokenType::Argument)
    }

    pub fn next_is_binary_operator(&self) -> bool {
        self.next_is(TokenType::OpInfix)
    }

    pub fn next_is_prefix_operator(&self) -> bool {
        self.next_is(TokenType::OpPrefix)
    }

    pub fn next_is_postfix_operator(&self) -> bool {
        self.next_is(TokenType::OpPostfix)
    }
}
