//! SQL operator types and conversions

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::{Error, Result};

/// Comparison operator of a predicate or join condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Is,
    IsNot,
    Between,
    NotBetween,
    Like,
    NotLike,
}

/// Operand shape an operator accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// One bound value
    Single,
    /// A non-empty list of bound values
    List,
    /// Exactly two bound values
    Range,
    /// No bound value, rendered as `NULL`
    Null,
}

impl Operator {
    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Operator::In | Operator::NotIn => Arity::List,
            Operator::Between | Operator::NotBetween => Arity::Range,
            Operator::Is | Operator::IsNot => Arity::Null,
            _ => Arity::Single,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let op = match normalized.to_ascii_uppercase().as_str() {
            "=" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "IS" => Operator::Is,
            "IS NOT" => Operator::IsNot,
            "BETWEEN" => Operator::Between,
            "NOT BETWEEN" => Operator::NotBetween,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            _ => {
                return Err(Error::invalid_query(format!("Unknown operator '{}'", s)));
            }
        };
        Ok(op)
    }
}

/// Trait for types that can be converted to SQL operators
pub trait IntoOperator {
    fn into_operator(self) -> Result<Operator>;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Result<Operator> {
        Ok(self)
    }
}

/// Allow string literals for the supported SQL operators
impl IntoOperator for &str {
    fn into_operator(self) -> Result<Operator> {
        self.parse()
    }
}

/// Convenience module for operator constants
pub mod op {
    use super::Operator;

    pub const EQ: Operator = Operator::Eq;
    pub const NEQ: Operator = Operator::NotEq;
    pub const LT: Operator = Operator::Lt;
    pub const LTE: Operator = Operator::Lte;
    pub const GT: Operator = Operator::Gt;
    pub const GTE: Operator = Operator::Gte;
    pub const IN: Operator = Operator::In;
    pub const NOT_IN: Operator = Operator::NotIn;
    pub const IS: Operator = Operator::Is;
    pub const IS_NOT: Operator = Operator::IsNot;
    pub const BETWEEN: Operator = Operator::Between;
    pub const NOT_BETWEEN: Operator = Operator::NotBetween;
    pub const LIKE: Operator = Operator::Like;
    pub const NOT_LIKE: Operator = Operator::NotLike;
}
