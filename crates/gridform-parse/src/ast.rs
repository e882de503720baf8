use std::fmt::{self, Display};

use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::token::{ARRAY, ARRAY_ROW};

/// How a cell reference is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CellRefType {
    /// `$A$1`, `$A`, `$1`
    Absolute,
    /// `$A1`, `A$1`
    Mixed,
    /// `A1`, `A`, `1`
    Relative,
    /// Anything else (names, structured references, ...).
    Unspecified,
}

static ABSOLUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\$[A-Z]+\$\d+|\$[A-Z]+|\$\d+)$").unwrap());
static MIXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(\$[A-Z]+\d+|[A-Z]+\$\d+)$").unwrap());
static RELATIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^([A-Z]+\d+|\d+|[A-Z]+)$").unwrap());

impl CellRefType {
    /// Classify one side of a reference. A `Sheet!` prefix is ignored.
    pub fn classify(reference: &str) -> Self {
        let local = match reference.rfind('!') {
            Some(bang) => &reference[bang + 1..],
            None => reference,
        };
        if ABSOLUTE.is_match(local) {
            CellRefType::Absolute
        } else if MIXED.is_match(local) {
            CellRefType::Mixed
        } else if RELATIVE.is_match(local) {
            CellRefType::Relative
        } else {
            CellRefType::Unspecified
        }
    }
}

/// A single cell (or whole row/column) reference as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellRef {
    pub ref_type: CellRefType,
    pub raw: String,
}

impl CellRef {
    pub fn new<S: Into<String>>(raw: S) -> Self {
        let raw = raw.into();
        CellRef {
            ref_type: CellRefType::classify(&raw),
            raw,
        }
    }
}

/// The parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum FormulaNode {
    Number {
        value: f64,
    },
    Text {
        value: String,
    },
    Logical {
        value: bool,
    },
    Cell(CellRef),
    CellRange {
        start: CellRef,
        end: CellRef,
    },
    UnaryExpression {
        op: String,
        operand: Box<FormulaNode>,
    },
    BinaryExpression {
        op: String,
        left: Box<FormulaNode>,
        right: Box<FormulaNode>,
    },
    Function {
        name: String,
        args: Vec<FormulaNode>,
    },
    /// An error literal used as a value, e.g. `#N/A`.
    ErrorValue {
        value: String,
    },
    /// An omitted argument, as in `IF(A1,,2)`.
    EmptyArgument,
    /// Placeholder for a token no terminal rule understands.
    Unknown {
        raw: String,
    },
}

impl FormulaNode {
    pub fn number(value: f64) -> Self {
        FormulaNode::Number { value }
    }

    pub fn text<S: Into<String>>(value: S) -> Self {
        FormulaNode::Text {
            value: value.into(),
        }
    }

    pub fn logical(value: bool) -> Self {
        FormulaNode::Logical { value }
    }

    pub fn cell<S: Into<String>>(raw: S) -> Self {
        FormulaNode::Cell(CellRef::new(raw))
    }

    /// `A1:B2` becomes a `CellRange`; anything without `:` a single `Cell`.
    pub fn range(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((start, end)) => FormulaNode::CellRange {
                start: CellRef::new(start),
                end: CellRef::new(end),
            },
            None => FormulaNode::cell(raw),
        }
    }

    pub fn unary<S: Into<String>>(op: S, operand: FormulaNode) -> Self {
        FormulaNode::UnaryExpression {
            op: op.into(),
            operand: Box::new(operand),
        }
    }

    pub fn binary<S: Into<String>>(op: S, left: FormulaNode, right: FormulaNode) -> Self {
        FormulaNode::BinaryExpression {
            op: op.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn function<S: Into<String>>(name: S, args: Vec<FormulaNode>) -> Self {
        FormulaNode::Function {
            name: name.into(),
            args,
        }
    }

    /// All `Cell` and `CellRange` nodes, left to right.
    pub fn references(&self) -> Vec<&FormulaNode> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a FormulaNode>) {
        match self {
            FormulaNode::Cell(_) | FormulaNode::CellRange { .. } => refs.push(self),
            FormulaNode::UnaryExpression { operand, .. } => operand.collect_references(refs),
            FormulaNode::BinaryExpression { left, right, .. } => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
            FormulaNode::Function { args, .. } => {
                for arg in args {
                    arg.collect_references(refs);
                }
            }
            _ => {}
        }
    }

    /// Binding strength used when printing; atoms bind tightest.
    fn precedence(&self) -> u8 {
        match self {
            FormulaNode::BinaryExpression { op, .. } => match op.as_str() {
                " " | "," => 8,
                "^" => 5,
                "*" | "/" => 4,
                "+" | "-" => 3,
                "&" => 2,
                _ => 1,
            },
            FormulaNode::UnaryExpression { op, .. } if op == "%" => 6,
            FormulaNode::UnaryExpression { .. } => 7,
            _ => 9,
        }
    }

    /// An `ARRAY` call whose arguments are all `ARRAYROW` calls, as built
    /// from `{...}`.
    fn array_rows(&self) -> Option<Vec<&[FormulaNode]>> {
        let FormulaNode::Function { name, args } = self else {
            return None;
        };
        if name != ARRAY || args.is_empty() {
            return None;
        }
        args.iter()
            .map(|row| match row {
                FormulaNode::Function { name, args } if name == ARRAY_ROW => Some(args.as_slice()),
                _ => None,
            })
            .collect()
    }

    fn fmt_child(
        &self,
        f: &mut fmt::Formatter<'_>,
        child: &FormulaNode,
        strict: bool,
    ) -> fmt::Result {
        let wrap = if strict {
            child.precedence() <= self.precedence()
        } else {
            child.precedence() < self.precedence()
        };
        if wrap {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[FormulaNode], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Prints canonical en-US formula text without the leading `=`.
impl Display for FormulaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaNode::Number { value } => write!(f, "{value}"),
            FormulaNode::Text { value } => write!(f, "\"{}\"", value.replace('"', "\"\"")),
            FormulaNode::Logical { value } => f.write_str(if *value { "TRUE" } else { "FALSE" }),
            FormulaNode::Cell(cell) => f.write_str(&cell.raw),
            FormulaNode::CellRange { start, end } => write!(f, "{}:{}", start.raw, end.raw),
            // A bare `5%` would read back as the number 0.05, and `-A1%` as
            // the negation of `A1%`.
            FormulaNode::UnaryExpression { op, operand } if op == "%" => {
                match operand.as_ref() {
                    FormulaNode::Number { .. } => write!(f, "({operand})")?,
                    FormulaNode::UnaryExpression { op: inner, .. } if inner != "%" => {
                        write!(f, "({operand})")?
                    }
                    _ => self.fmt_child(f, operand, false)?,
                }
                f.write_str("%")
            }
            FormulaNode::UnaryExpression { op, operand } => {
                f.write_str(op)?;
                self.fmt_child(f, operand, false)
            }
            FormulaNode::BinaryExpression { op, left, right } => {
                self.fmt_child(f, left, false)?;
                f.write_str(op)?;
                self.fmt_child(f, right, true)
            }
            FormulaNode::Function { name, args } => {
                if let Some(rows) = self.array_rows() {
                    f.write_str("{")?;
                    for (i, row) in rows.into_iter().enumerate() {
                        if i > 0 {
                            f.write_str(";")?;
                        }
                        write_list(f, row, ",")?;
                    }
                    return f.write_str("}");
                }
                write!(f, "{name}(")?;
                write_list(f, args, ",")?;
                f.write_str(")")
            }
            FormulaNode::ErrorValue { value } => f.write_str(value),
            FormulaNode::EmptyArgument => Ok(()),
            FormulaNode::Unknown { raw } => f.write_str(raw),
        }
    }
}
