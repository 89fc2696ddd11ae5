//! Safe arithmetic/boolean expression evaluation over named bindings.
//!
//! Expressions are parsed into a small closed tree and evaluated by an
//! allow-list walk; there is no callout to any "run this text as code"
//! facility. Function calls, attribute access, indexing, and string or
//! collection literals are rejected by name.

use std::collections::BTreeSet;
use std::fmt;

mod parse;

use parse::{BinaryOp, CompareOp, Expr, UnaryOp};

pub type Bindings = std::collections::BTreeMap<String, Evaluated>;

/// Result of evaluating an expression. True division always yields `Float`,
/// floor division on integers stays `Int`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Evaluated {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Evaluated {
    pub fn as_f64(&self) -> f64 {
        match self {
            Evaluated::Int(i) => *i as f64,
            Evaluated::Float(f) => *f,
            Evaluated::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Evaluated::Int(i) => *i != 0,
            Evaluated::Float(f) => *f != 0.0,
            Evaluated::Bool(b) => *b,
        }
    }
}

impl fmt::Display for Evaluated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluated::Int(i) => write!(f, "{i}"),
            Evaluated::Float(x) => write!(f, "{x}"),
            Evaluated::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprError {
    Syntax(String),
    UnknownVariable(String),
    UnknownVariables(Vec<String>),
    DivisionByZero,
    Unsupported(&'static str),
    ComparisonsDisabled,
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "invalid expression syntax: {msg}"),
            Self::UnknownVariable(name) => write!(f, "unknown variable: {name}"),
            Self::UnknownVariables(names) => {
                write!(f, "unknown variables: {}", names.join(", "))
            }
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::Unsupported(kind) => write!(f, "unsupported expression: {kind}"),
            Self::ComparisonsDisabled => write!(f, "comparisons are disabled"),
        }
    }
}

impl std::error::Error for ExprError {}

/// Evaluator for the restricted expression grammar. Pure; holds only the
/// comparison flag, so one instance is shareable across callers.
#[derive(Clone, Copy, Debug)]
pub struct SafeEvaluator {
    allow_comparisons: bool,
}

impl Default for SafeEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl SafeEvaluator {
    pub fn new() -> Self {
        Self {
            allow_comparisons: true,
        }
    }

    pub fn without_comparisons() -> Self {
        Self {
            allow_comparisons: false,
        }
    }

    pub fn evaluate(&self, text: &str, bindings: &Bindings) -> Result<Evaluated, ExprError> {
        let expr = parse::parse(text.trim())?;
        self.eval(&expr, bindings)
    }

    /// Parse without evaluating and return the free variable names. When
    /// `known` is given, names outside it fail with a readable error.
    pub fn validate(
        &self,
        text: &str,
        known: Option<&BTreeSet<String>>,
    ) -> Result<BTreeSet<String>, ExprError> {
        let expr = parse::parse(text.trim())?;
        let mut referenced = BTreeSet::new();
        parse::free_variables(&expr, &mut referenced);

        if let Some(known) = known {
            let unknown: Vec<String> = referenced.difference(known).cloned().collect();
            if !unknown.is_empty() {
                return Err(ExprError::UnknownVariables(unknown));
            }
        }
        Ok(referenced)
    }

    fn eval(&self, expr: &Expr, bindings: &Bindings) -> Result<Evaluated, ExprError> {
        match expr {
            Expr::Literal(value) => Ok(*value),
            Expr::Var(name) => bindings
                .get(name)
                .copied()
                .ok_or_else(|| ExprError::UnknownVariable(name.clone())),
            Expr::Unary(op, inner) => {
                let value = self.eval(inner, bindings)?;
                Ok(match op {
                    UnaryOp::Pos => value,
                    UnaryOp::Neg => match value {
                        Evaluated::Int(i) => i
                            .checked_neg()
                            .map(Evaluated::Int)
                            .unwrap_or(Evaluated::Float(-(i as f64))),
                        other => Evaluated::Float(-other.as_f64()),
                    },
                })
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, bindings)?;
                let right = self.eval(right, bindings)?;
                binary(*op, left, right)
            }
            Expr::Compare(first, rest) => {
                if !self.allow_comparisons {
                    return Err(ExprError::ComparisonsDisabled);
                }
                let mut left = self.eval(first, bindings)?;
                for (op, operand) in rest {
                    let right = self.eval(operand, bindings)?;
                    if !compare(*op, left, right) {
                        return Ok(Evaluated::Bool(false));
                    }
                    left = right;
                }
                Ok(Evaluated::Bool(true))
            }
            Expr::And(operands) => {
                for operand in operands {
                    if !self.eval(operand, bindings)?.is_truthy() {
                        return Ok(Evaluated::Bool(false));
                    }
                }
                Ok(Evaluated::Bool(true))
            }
            Expr::Or(operands) => {
                for operand in operands {
                    if self.eval(operand, bindings)?.is_truthy() {
                        return Ok(Evaluated::Bool(true));
                    }
                }
                Ok(Evaluated::Bool(false))
            }
        }
    }
}

// Booleans participate in arithmetic as 0/1.
fn to_int(value: Evaluated) -> Option<i64> {
    match value {
        Evaluated::Int(i) => Some(i),
        Evaluated::Bool(b) => Some(if b { 1 } else { 0 }),
        Evaluated::Float(_) => None,
    }
}

fn binary(op: BinaryOp, left: Evaluated, right: Evaluated) -> Result<Evaluated, ExprError> {
    match op {
        BinaryOp::Add => Ok(int_or_float(left, right, i64::checked_add, |a, b| a + b)),
        BinaryOp::Sub => Ok(int_or_float(left, right, i64::checked_sub, |a, b| a - b)),
        BinaryOp::Mul => Ok(int_or_float(left, right, i64::checked_mul, |a, b| a * b)),
        BinaryOp::Div => {
            let divisor = right.as_f64();
            if divisor == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            // True division is always fractional, even for whole operands.
            Ok(Evaluated::Float(left.as_f64() / divisor))
        }
        BinaryOp::FloorDiv => {
            if right.as_f64() == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            match (to_int(left), to_int(right)) {
                (Some(a), Some(b)) if !(a == i64::MIN && b == -1) => {
                    Ok(Evaluated::Int(floor_div(a, b)))
                }
                _ => Ok(Evaluated::Float((left.as_f64() / right.as_f64()).floor())),
            }
        }
        BinaryOp::Mod => {
            if right.as_f64() == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            match (to_int(left), to_int(right)) {
                (Some(a), Some(b)) if !(a == i64::MIN && b == -1) => {
                    Ok(Evaluated::Int(floor_mod(a, b)))
                }
                _ => {
                    let (a, b) = (left.as_f64(), right.as_f64());
                    Ok(Evaluated::Float(a - b * (a / b).floor()))
                }
            }
        }
        BinaryOp::Pow => match (to_int(left), to_int(right)) {
            (Some(a), Some(b)) if (0..=u32::MAX as i64).contains(&b) => Ok(a
                .checked_pow(b as u32)
                .map(Evaluated::Int)
                .unwrap_or_else(|| Evaluated::Float((a as f64).powf(b as f64)))),
            _ => Ok(Evaluated::Float(left.as_f64().powf(right.as_f64()))),
        },
    }
}

fn int_or_float(
    left: Evaluated,
    right: Evaluated,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Evaluated {
    match (to_int(left), to_int(right)) {
        (Some(a), Some(b)) => int_op(a, b)
            .map(Evaluated::Int)
            .unwrap_or_else(|| Evaluated::Float(float_op(a as f64, b as f64))),
        _ => Evaluated::Float(float_op(left.as_f64(), right.as_f64())),
    }
}

// Quotient rounded toward negative infinity, remainder with the divisor's
// sign. Matches the semantics trace authors expect from `//` and `%`.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) { q - 1 } else { q }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }
}

fn compare(op: CompareOp, left: Evaluated, right: Evaluated) -> bool {
    let exact = match (to_int(left), to_int(right)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => left.as_f64().partial_cmp(&right.as_f64()),
    };
    let Some(ordering) = exact else {
        return false;
    };
    match op {
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Le => ordering.is_le(),
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::Ge => ordering.is_ge(),
        CompareOp::Eq => ordering.is_eq(),
        CompareOp::Ne => ordering.is_ne(),
    }
}
