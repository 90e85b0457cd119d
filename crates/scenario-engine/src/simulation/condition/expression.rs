//! Restricted derived operands: one variable combined with one numeric constant.
//!
//! Authors write `"monthlyExpense * 6"` or `"500 + baseline"`. Nothing else is accepted, so the
//! grammar has no nesting and evaluation never recurses.

use std::fmt;
use std::str::FromStr;

use logos::Logos;

const MAX_EXPRESSION_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Multiply,
}

impl ArithmeticOp {
    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Multiply => '*',
        }
    }

    fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Self::Add => left + right,
            Self::Multiply => left * right,
        }
    }
}

/// `variable <op> constant`. Operand order in the source text is not preserved; both
/// operations are commutative.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedExpression {
    pub variable: String,
    pub op: ArithmeticOp,
    pub constant: f64,
}

impl DerivedExpression {
    pub fn new(variable: impl Into<String>, op: ArithmeticOp, constant: f64) -> Self {
        Self {
            variable: variable.into(),
            op,
            constant,
        }
    }

    /// Applies the expression to the bound value of `variable`. Non-finite results yield `None`.
    pub fn apply(&self, bound: f64) -> Option<f64> {
        let value = self.op.apply(bound, self.constant);
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for DerivedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.variable, self.op.symbol(), self.constant)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,
    #[error("expression exceeds {MAX_EXPRESSION_LEN} characters")]
    TooLong,
    #[error("unexpected character '{0}' in expression")]
    UnexpectedCharacter(char),
    #[error("invalid numeric constant '{0}'")]
    InvalidNumber(String),
    #[error("expected `<variable> <*|+> <number>`, found '{0}'")]
    Shape(String),
}

/// Borrowing lexer token; converted to an owned [`Token`] once its slice is parsed.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[regex(r"-?([0-9]+(\.[0-9]*)?|\.[0-9]+)")]
    Number,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Op(ArithmeticOp),
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Identifier rule shared with plain variable references.
pub(crate) fn is_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_continue)
}

/// A leading `-` belongs to the number, so `a + -5` lexes as three tokens and `a - 5` as two.
fn tokenize(raw: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(raw);

    while let Some(result) = lexer.next() {
        let slice = lexer.slice();
        let token = match result {
            Ok(RawToken::Star) => Token::Op(ArithmeticOp::Multiply),
            Ok(RawToken::Plus) => Token::Op(ArithmeticOp::Add),
            Ok(RawToken::Ident) => Token::Ident(slice.to_string()),
            Ok(RawToken::Number) => slice
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Token::Number)
                .ok_or_else(|| ExpressionError::InvalidNumber(slice.to_string()))?,
            Err(()) => {
                let ch = slice.chars().next().unwrap_or_default();
                return Err(ExpressionError::UnexpectedCharacter(ch));
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

impl FromStr for DerivedExpression {
    type Err = ExpressionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ExpressionError::Empty);
        }
        if trimmed.len() > MAX_EXPRESSION_LEN {
            return Err(ExpressionError::TooLong);
        }

        match tokenize(trimmed)?.as_slice() {
            [Token::Ident(variable), Token::Op(op), Token::Number(constant)]
            | [Token::Number(constant), Token::Op(op), Token::Ident(variable)] => {
                Ok(DerivedExpression::new(variable.clone(), *op, *constant))
            }
            _ => Err(ExpressionError::Shape(trimmed.to_string())),
        }
    }
}
