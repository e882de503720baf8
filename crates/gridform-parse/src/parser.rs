//! Shunting-yard parser.
//!
//! Binary and unary expressions are resolved with two explicit stacks
//! (operands and operators) instead of one recursive rule per precedence
//! level. Recursion only happens when entering a parenthesis or an argument
//! list, and that is bounded by [`ParseOptions::max_depth`]. Operator chains
//! need no recursion to parse, but the trees they build are walked
//! recursively afterwards, so their height is bounded by
//! [`ParseOptions::max_height`].

use gridform_common::{ErrorNode, Locale};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ast::FormulaNode;
use crate::operator::{Arity, Operator, StackEntry};
use crate::stream::TokenStream;
use crate::token::{SubType, Token};
use crate::tokenizer::{tokenize, tokenize_strict};

pub const DEFAULT_MAX_DEPTH: usize = 256;
pub const DEFAULT_MAX_HEIGHT: usize = 1024;

/// Knobs for [`parse_with_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParseOptions {
    pub locale: Locale,
    /// Maximum nesting of parentheses and function calls.
    pub max_depth: usize,
    /// Maximum height of the resulting tree, counting every operator and
    /// call between the root and the deepest leaf.
    pub max_height: usize,
    /// Reject unterminated strings, paths, brackets and error literals with a
    /// `Lex` error instead of tokenizing them best-effort.
    pub strict_lexing: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            locale: Locale::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_height: DEFAULT_MAX_HEIGHT,
            strict_lexing: false,
        }
    }
}

impl ParseOptions {
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_height(mut self, max_height: usize) -> Self {
        self.max_height = max_height;
        self
    }

    pub fn strict_lexing(mut self, strict: bool) -> Self {
        self.strict_lexing = strict;
        self
    }
}

/// Tokenize and parse `formula` in the given locale.
pub fn parse(formula: &str, locale: Locale) -> Result<FormulaNode, ErrorNode> {
    parse_with_options(formula, &ParseOptions::default().with_locale(locale))
}

pub fn parse_with_options(
    formula: &str,
    options: &ParseOptions,
) -> Result<FormulaNode, ErrorNode> {
    #[cfg(feature = "tracing")]
    let _span =
        tracing::debug_span!("parse", locale = %options.locale, len = formula.len()).entered();

    let table = options.locale.table();
    let tokens = if options.strict_lexing {
        tokenize_strict(formula, table)?
    } else {
        tokenize(formula, table)
    };
    Parser::new(tokens)
        .with_max_depth(options.max_depth)
        .with_max_height(options.max_height)
        .parse()
}

/// Parse an already tokenized formula.
pub fn parse_formula(tokens: Vec<Token>) -> Result<FormulaNode, ErrorNode> {
    Parser::new(tokens).parse()
}

/// A finished subtree on the operand stack.
struct Operand {
    node: FormulaNode,
    height: usize,
}

/// One parse run. Owns its stream cursor and both stacks; nothing survives
/// between runs.
pub struct Parser {
    stream: TokenStream,
    operands: Vec<Operand>,
    operators: SmallVec<[StackEntry; 16]>,
    depth: usize,
    max_depth: usize,
    max_height: usize,
}

impl<T> From<T> for Parser
where
    T: AsRef<str>,
{
    fn from(formula: T) -> Self {
        Self::new(tokenize(formula.as_ref(), Locale::default().table()))
    }
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            stream: TokenStream::new(tokens),
            operands: Vec::new(),
            operators: SmallVec::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_height(mut self, max_height: usize) -> Self {
        self.max_height = max_height;
        self
    }

    /// Parse the whole stream into a single tree.
    pub fn parse(mut self) -> Result<FormulaNode, ErrorNode> {
        if self.stream.is_empty() {
            return Err(ErrorNode::syntax("Empty formula"));
        }
        self.operators.push(StackEntry::Sentinel);
        self.parse_expression()?;
        if !self.stream.next_is_end_of_stream() {
            return Err(ErrorNode::invalid_syntax());
        }
        let root = self.pop_operand()?;
        if !self.operands.is_empty() {
            return Err(ErrorNode::invalid_syntax());
        }
        Ok(root.node)
    }

    fn parse_expression(&mut self) -> Result<(), ErrorNode> {
        self.parse_operand_expression()?;
        let mut last_position = None;
        while self.stream.next_is_binary_operator() {
            // An operator that did not move the cursor would loop forever.
            if last_position == Some(self.stream.position()) {
                return Err(ErrorNode::invalid_syntax());
            }
            last_position = Some(self.stream.position());
            let op = Operator::binary(&self.stream.peek().value)?;
            self.push_operator(op)?;
            self.stream.consume()?;
            self.parse_operand_expression()?;
        }
        while matches!(self.operators.last(), Some(StackEntry::Operator(_))) {
            self.pop_operator()?;
        }
        Ok(())
    }

    fn parse_operand_expression(&mut self) -> Result<(), ErrorNode> {
        while self.stream.next_is_prefix_operator() {
            let op = Operator::unary(&self.stream.peek().value)?;
            self.push_operator(op)?;
            self.stream.consume()?;
        }

        if self.stream.next_is_terminal() {
            let node = self.parse_terminal()?;
            self.push_leaf(node);
        } else if self.stream.next_is_open_paren() {
            self.stream.consume()?;
            self.within_sentinel(Self::parse_expression)?;
            if !self.stream.next_is_close_paren() {
                return Err(ErrorNode::invalid_syntax());
            }
            self.stream.consume()?;
        } else if self.stream.next_is_function_call() {
            self.parse_function_call()?;
        } else if self.stream.next_is_error() {
            let value = self.stream.peek().value.clone();
            self.stream.consume()?;
            self.push_leaf(FormulaNode::ErrorValue { value });
        } else if self.stream.next_is_unknown() {
            let raw = self.stream.peek().value.clone();
            self.stream.consume()?;
            self.push_leaf(FormulaNode::Unknown { raw });
        } else {
            return Err(ErrorNode::invalid_syntax());
        }

        self.parse_postfix()
    }

    /// `%` after anything but a number literal (those fold the percent into
    /// their value).
    fn parse_postfix(&mut self) -> Result<(), ErrorNode> {
        while self.stream.next_is_postfix_operator() {
            let symbol = self.stream.peek().value.clone();
            self.stream.consume()?;
            let operand = self.pop_operand()?;
            self.push_operand(FormulaNode::unary(symbol, operand.node), operand.height + 1)?;
        }
        Ok(())
    }

    fn parse_terminal(&mut self) -> Result<FormulaNode, ErrorNode> {
        let token = self.stream.peek().clone();
        self.stream.consume()?;
        let node = match token.subtype {
            SubType::Number => {
                let mut value = token
                    .value
                    .parse::<f64>()
                    .map_err(|_| ErrorNode::syntax(format!("Invalid number {}", token.value)))?;
                if self.stream.next_is_postfix_operator() {
                    value *= 0.01;
                    self.stream.consume()?;
                }
                FormulaNode::number(value)
            }
            SubType::Text => FormulaNode::Text { value: token.value },
            SubType::Logical => FormulaNode::logical(token.value == "TRUE"),
            SubType::Range => FormulaNode::range(&token.value),
            _ => FormulaNode::Unknown { raw: token.value },
        };
        Ok(node)
    }

    fn parse_function_call(&mut self) -> Result<(), ErrorNode> {
        let name = self.stream.peek().value.clone();
        self.stream.consume()?;
        let args = self.within_sentinel(Self::parse_argument_list)?;
        let height = 1 + args.iter().map(|arg| arg.height).max().unwrap_or(0);
        let args = args.into_iter().map(|arg| arg.node).collect();
        self.push_operand(FormulaNode::function(name, args), height)?;
        self.stream.consume()
    }

    /// Parse arguments up to (not including) the closing token and return
    /// them in source order.
    fn parse_argument_list(&mut self) -> Result<Vec<Operand>, ErrorNode> {
        let mut arity = 0;
        let mut after_separator = false;
        loop {
            if self.stream.next_is_end_of_function_call() {
                if after_separator {
                    self.push_leaf(FormulaNode::EmptyArgument);
                    arity += 1;
                }
                break;
            }
            if self.stream.next_is_argument_separator() {
                self.push_leaf(FormulaNode::EmptyArgument);
            } else {
                self.parse_expression()?;
            }
            arity += 1;
            if self.stream.next_is_argument_separator() {
                self.stream.consume()?;
                after_separator = true;
            } else if self.stream.next_is_end_of_function_call() {
                after_separator = false;
            } else {
                return Err(ErrorNode::invalid_syntax());
            }
        }

        let first = self
            .operands
            .len()
            .checked_sub(arity)
            .ok_or_else(ErrorNode::invalid_syntax)?;
        Ok(self.operands.split_off(first))
    }

    /// Run `f` with a sentinel on the operator stack so it cannot reduce
    /// operators that belong to the enclosing expression.
    fn within_sentinel<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, ErrorNode>,
    ) -> Result<R, ErrorNode> {
        if self.depth >= self.max_depth {
            return Err(ErrorNode::syntax(format!(
                "Formula nesting exceeds {} levels",
                self.max_depth
            )));
        }
        self.depth += 1;
        self.operators.push(StackEntry::Sentinel);
        let result = f(self)?;
        match self.operators.pop() {
            Some(StackEntry::Sentinel) => {}
            _ => return Err(ErrorNode::invalid_syntax()),
        }
        self.depth -= 1;
        Ok(result)
    }

    fn push_operator(&mut self, op: Operator) -> Result<(), ErrorNode> {
        while self
            .operators
            .last()
            .is_some_and(|top| top.evaluates_before(&op))
        {
            self.pop_operator()?;
        }
        self.operators.push(StackEntry::Operator(op));
        Ok(())
    }

    /// Reduce the top operator with its operands into one node.
    fn pop_operator(&mut self) -> Result<(), ErrorNode> {
        let op = match self.operators.pop() {
            Some(StackEntry::Operator(op)) => op,
            _ => return Err(ErrorNode::invalid_syntax()),
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(symbol = %op.symbol, "reduce");

        match op.arity {
            Arity::Binary => {
                let right = self.pop_operand()?;
                let left = self.pop_operand()?;
                let height = 1 + left.height.max(right.height);
                self.push_operand(FormulaNode::binary(op.symbol, left.node, right.node), height)
            }
            Arity::Unary => {
                let operand = self.pop_operand()?;
                self.push_operand(FormulaNode::unary(op.symbol, operand.node), operand.height + 1)
            }
        }
    }

    fn push_leaf(&mut self, node: FormulaNode) {
        self.operands.push(Operand { node, height: 1 });
    }

    fn push_operand(&mut self, node: FormulaNode, height: usize) -> Result<(), ErrorNode> {
        if height > self.max_height {
            return Err(ErrorNode::syntax(format!(
                "Expression exceeds {} levels",
                self.max_height
            )));
        }
        self.operands.push(Operand { node, height });
        Ok(())
    }

    fn pop_operand(&mut self) -> Result<Operand, ErrorNode> {
        self.operands.pop().ok_or_else(ErrorNode::invalid_syntax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CellRef, CellRefType};
    use gridform_common::ErrorKind;

    fn n(value: f64) -> FormulaNode {
        FormulaNode::number(value)
    }

    fn en(formula: &str) -> Result<FormulaNode, ErrorNode> {
        parse(formula, Locale::EnUs)
    }

    #[test]
    fn precedence() {
        assert_eq!(
            en("=1+2*3"),
            Ok(FormulaNode::binary("+", n(1.0), FormulaNode::binary("*", n(2.0), n(3.0))))
        );
        assert_eq!(
            en("=2^3*4"),
            Ok(FormulaNode::binary("*", FormulaNode::binary("^", n(2.0), n(3.0)), n(4.0)))
        );
    }

    #[test]
    fn left_associativity() {
        assert_eq!(
            en("=8-3-2"),
            Ok(FormulaNode::binary("-", FormulaNode::binary("-", n(8.0), n(3.0)), n(2.0)))
        );
        assert_eq!(
            en("=2^3^2"),
            Ok(FormulaNode::binary("^", FormulaNode::binary("^", n(2.0), n(3.0)), n(2.0)))
        );
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(
            en("=(1+2)*3"),
            Ok(FormulaNode::binary("*", FormulaNode::binary("+", n(1.0), n(2.0)), n(3.0)))
        );
    }

    #[test]
    fn function_arguments_keep_order() {
        assert_eq!(
            en("=SUM(1,2,3)"),
            Ok(FormulaNode::function("SUM", vec![n(1.0), n(2.0), n(3.0)]))
        );
        assert_eq!(en("=NOW()"), Ok(FormulaNode::function("NOW", vec![])));
    }

    #[test]
    fn nested_functions() {
        assert_eq!(
            en("=IF(A1>0,SUM(B1:B3),-1)"),
            Ok(FormulaNode::function(
                "IF",
                vec![
                    FormulaNode::binary(">", FormulaNode::cell("A1"), n(0.0)),
                    FormulaNode::function("SUM", vec![FormulaNode::range("B1:B3")]),
                    FormulaNode::unary("-", n(1.0)),
                ]
            ))
        );
    }

    #[test]
    fn empty_arguments() {
        assert_eq!(
            en("=IF(A1,,2)"),
            Ok(FormulaNode::function(
                "IF",
                vec![FormulaNode::cell("A1"), FormulaNode::EmptyArgument, n(2.0)]
            ))
        );
        assert_eq!(
            en("=F(,1,)"),
            Ok(FormulaNode::function(
                "F",
                vec![FormulaNode::EmptyArgument, n(1.0), FormulaNode::EmptyArgument]
            ))
        );
    }

    #[test]
    fn percent() {
        assert_eq!(en("=50%"), Ok(n(0.5)));
        assert_eq!(
            en("=A1%"),
            Ok(FormulaNode::unary("%", FormulaNode::cell("A1")))
        );
        assert_eq!(en("=-50%"), Ok(FormulaNode::unary("-", n(0.5))));
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        assert_eq!(
            en("=-2^2"),
            Ok(FormulaNode::binary("^", FormulaNode::unary("-", n(2.0)), n(2.0)))
        );
        assert_eq!(
            en("=2*--3"),
            Ok(FormulaNode::binary(
                "*",
                n(2.0),
                FormulaNode::unary("-", FormulaNode::unary("-", n(3.0)))
            ))
        );
    }

    #[test]
    fn ranges_and_cells() {
        assert_eq!(
            en("=A1:B2"),
            Ok(FormulaNode::CellRange {
                start: CellRef {
                    ref_type: CellRefType::Relative,
                    raw: "A1".into()
                },
                end: CellRef {
                    ref_type: CellRefType::Relative,
                    raw: "B2".into()
                },
            })
        );
        assert_eq!(
            en("=$A$1"),
            Ok(FormulaNode::Cell(CellRef {
                ref_type: CellRefType::Absolute,
                raw: "$A$1".into()
            }))
        );
    }

    #[test]
    fn literals() {
        assert_eq!(en("=\"hi\""), Ok(FormulaNode::text("hi")));
        assert_eq!(en("=true"), Ok(FormulaNode::logical(true)));
        assert_eq!(
            en("=#N/A"),
            Ok(FormulaNode::ErrorValue {
                value: "#N/A".into()
            })
        );
        assert_eq!(
            parse("=WAHR", Locale::DeDe),
            Ok(FormulaNode::logical(true))
        );
        assert_eq!(parse("=1,5", Locale::DeDe), Ok(n(1.5)));

        // Out of range literals are not numbers.
        let huge = en("=1E999").unwrap();
        assert_eq!(huge, FormulaNode::cell("1E999"));
        assert_eq!(en(&format!("={huge}")), Ok(huge));
    }

    #[test]
    fn intersection_and_union() {
        assert_eq!(
            en("=A1:B2 B1:C3"),
            Ok(FormulaNode::binary(
                " ",
                FormulaNode::range("A1:B2"),
                FormulaNode::range("B1:C3")
            ))
        );
        assert_eq!(
            en("=(A1,B1)"),
            Ok(FormulaNode::binary(",", FormulaNode::cell("A1"), FormulaNode::cell("B1")))
        );
    }

    #[test]
    fn comparison_and_concat_are_loosest() {
        assert_eq!(
            en("=\"a\"&1+2=\"a3\""),
            Ok(FormulaNode::binary(
                "=",
                FormulaNode::binary(
                    "&",
                    FormulaNode::text("a"),
                    FormulaNode::binary("+", n(1.0), n(2.0))
                ),
                FormulaNode::text("a3")
            ))
        );
    }

    #[test]
    fn array_literal_parses_as_nested_functions() {
        assert_eq!(
            en("={1,2;3,4}"),
            Ok(FormulaNode::function(
                "ARRAY",
                vec![
                    FormulaNode::function("ARRAYROW", vec![n(1.0), n(2.0)]),
                    FormulaNode::function("ARRAYROW", vec![n(3.0), n(4.0)]),
                ]
            ))
        );
    }

    #[test]
    fn malformed_input_is_an_error() {
        for formula in [
            "=1+",
            "=",
            "=SUM(1",
            "=(1",
            "=1)",
            "=*2",
            "=SUM(1,-)",
            "=1 +",
            "=(1)2",
            "=SUM((1)2)",
        ] {
            let result = en(formula);
            assert!(result.is_err(), "{formula} parsed to {result:?}");
        }
        assert_eq!(en("=1+"), Err(ErrorNode::invalid_syntax()));
        assert_eq!(en(""), Err(ErrorNode::syntax("Empty formula")));
    }

    #[test]
    fn strict_lexing_surfaces_lex_errors() {
        let options = ParseOptions::default().strict_lexing(true);
        let err = parse_with_options("=\"open", &options).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lex);
        assert!(parse_with_options("=\"open", &ParseOptions::default()).is_ok());
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("={}1{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(en(&deep), Ok(n(1.0)));

        let options = ParseOptions::default().with_max_depth(10);
        let err = parse_with_options(&deep, &options).unwrap_err();
        assert_eq!(err.message, "Formula nesting exceeds 10 levels");

        let very_deep = format!("={}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(en(&very_deep).is_err());
    }

    #[test]
    fn long_operator_chains_are_bounded() {
        let sum = format!("=1{}", "+1".repeat(200_000));
        assert_eq!(en(&sum), Err(ErrorNode::syntax("Expression exceeds 1024 levels")));
        let negations = format!("={}1", "-".repeat(200_000));
        assert_eq!(en(&negations), Err(ErrorNode::syntax("Expression exceeds 1024 levels")));
        let percents = format!("=A1{}", "%".repeat(200_000));
        assert!(en(&percents).is_err());

        assert!(en(&format!("=1{}", "+1".repeat(500))).is_ok());
        let options = ParseOptions::default().with_max_height(3);
        assert!(parse_with_options("=1+2+3", &options).is_ok());
        assert_eq!(
            parse_with_options("=1+2+3+4", &options),
            Err(ErrorNode::syntax("Expression exceeds 3 levels"))
        );
        assert_eq!(
            parse_with_options("=SUM(SUM(-1))", &options),
            Err(ErrorNode::syntax("Expression exceeds 3 levels"))
        );
    }

    #[test]
    fn calls_named_like_array_wrappers() {
        assert_eq!(en("=ARRAY(1)"), Ok(FormulaNode::function("ARRAY", vec![n(1.0)])));
        assert_eq!(
            en("=LET(x,1,ARRAY(x))"),
            Ok(FormulaNode::function(
                "LET",
                vec![
                    FormulaNode::cell("x"),
                    n(1.0),
                    FormulaNode::function("ARRAY", vec![FormulaNode::cell("x")]),
                ]
            ))
        );
        assert_eq!(
            parse("=ARRAYROW(1;2)", Locale::DeDe),
            Ok(FormulaNode::function("ARRAYROW", vec![n(1.0), n(2.0)]))
        );
        let tree = en("=ARRAY(1)+{2}").unwrap();
        assert_eq!(tree.to_string(), "ARRAY(1)+{2}");
    }

    #[test]
    fn parser_from_str() {
        assert_eq!(Parser::from("=1+1").parse(), Ok(FormulaNode::binary("+", n(1.0), n(1.0))));
    }
}
