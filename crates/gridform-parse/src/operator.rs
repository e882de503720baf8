use gridform_common::ErrorNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
}

/// An operator waiting on the shunting-yard operator stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub symbol: String,
    pub precedence: u8,
    pub arity: Arity,
}

impl Operator {
    /// Look up a binary operator. Higher precedence binds tighter.
    pub fn binary(symbol: &str) -> Result<Self, ErrorNode> {
        let precedence = match symbol {
            " " | "," => 8,
            "^" => 5,
            "*" | "/" => 4,
            "+" | "-" => 3,
            "&" => 2,
            "=" | "<>" | "<=" | ">=" | ">" | "<" => 1,
            _ => return Err(unsupported(symbol)),
        };
        Ok(Operator {
            symbol: symbol.to_string(),
            precedence,
            arity: Arity::Binary,
        })
    }

    /// Look up a prefix operator.
    pub fn unary(symbol: &str) -> Result<Self, ErrorNode> {
        match symbol {
            "-" => Ok(Operator {
                symbol: symbol.to_string(),
                precedence: 7,
                arity: Arity::Unary,
            }),
            _ => Err(unsupported(symbol)),
        }
    }

    pub fn is_unary(&self) -> bool {
        self.arity == Arity::Unary
    }

    /// Whether `self`, sitting on the stack, must be reduced before `incoming`
    /// is pushed. An incoming prefix operator never forces a reduction; equal
    /// binary precedence reduces (left associativity).
    pub fn evaluates_before(&self, incoming: &Operator) -> bool {
        if incoming.is_unary() {
            return false;
        }
        // Every binary operator is left-associative, so ties reduce for both arities.
        self.precedence >= incoming.precedence
    }
}

fn unsupported(symbol: &str) -> ErrorNode {
    ErrorNode::syntax(format!("unsupported operator {symbol}"))
}

/// Operator stack element. The sentinel bounds reduction at a parenthesis,
/// argument list or array row and never reduces itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    Sentinel,
    Operator(Operator),
}

impl StackEntry {
    pub fn evaluates_before(&self, incoming: &Operator) -> bool {
        match self {
            StackEntry::Sentinel => false,
            StackEntry::Operator(op) => op.evaluates_before(incoming),
        }
    }
}
