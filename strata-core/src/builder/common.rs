//! Predicate model and the clause types shared by the query builder

use crate::operator::Arity;
use crate::{Error, IntoOperator, Operator, Result, Value};
use chrono::{DateTime, Utc};

/// How a predicate is connected to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Right-hand side of a predicate.
///
/// Each operator accepts exactly one shape (see [`Operator::arity`]), which
/// is what keeps placeholders and arguments in lockstep.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No bound value, rendered as `NULL`
    Null,
    /// One bound value
    Single(Value),
    /// Values for `IN` / `NOT IN`
    List(Vec<Value>),
    /// Bounds for `BETWEEN` / `NOT BETWEEN`
    Range(Value, Value),
}

impl Operand {
    /// Number of positional arguments this operand binds
    pub fn arg_count(&self) -> usize {
        match self {
            Operand::Null => 0,
            Operand::Single(_) => 1,
            Operand::List(values) => values.len(),
            Operand::Range(..) => 2,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Operand::Null => "NULL",
            Operand::Single(_) => "a single value",
            Operand::List(_) => "a list",
            Operand::Range(..) => "a pair",
        }
    }
}

/// Trait for types usable as the right-hand side of a condition
pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

impl IntoOperand for Operand {
    fn into_operand(self) -> Operand {
        self
    }
}

impl IntoOperand for () {
    fn into_operand(self) -> Operand {
        Operand::Null
    }
}

macro_rules! scalar_operand {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoOperand for $ty {
                fn into_operand(self) -> Operand {
                    Operand::Single(self.into())
                }
            }
        )*
    };
}

scalar_operand!(
    Value,
    bool,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    &str,
    &String,
    serde_json::Value,
    DateTime<Utc>,
);

impl<T> IntoOperand for Option<T>
where
    T: Into<Value>,
{
    fn into_operand(self) -> Operand {
        Operand::Single(Value::from(self))
    }
}

impl<T> IntoOperand for Vec<T>
where
    T: Into<Value>,
{
    fn into_operand(self) -> Operand {
        Operand::List(self.into_iter().map(Into::into).collect())
    }
}

impl<T, const N: usize> IntoOperand for [T; N]
where
    T: Into<Value>,
{
    fn into_operand(self) -> Operand {
        Operand::List(self.into_iter().map(Into::into).collect())
    }
}

impl<A, B> IntoOperand for (A, B)
where
    A: Into<Value>,
    B: Into<Value>,
{
    fn into_operand(self) -> Operand {
        Operand::Range(self.0.into(), self.1.into())
    }
}

/// Trait for conditions that can be used in WHERE and HAVING clauses
pub trait IntoCondition {
    fn into_condition(self) -> Result<(String, Operator, Operand)>;
}

// Shorthand equality: where_(("age", 18))
impl<T> IntoCondition for (&str, T)
where
    T: IntoOperand,
{
    fn into_condition(self) -> Result<(String, Operator, Operand)> {
        Ok((self.0.to_string(), Operator::Eq, self.1.into_operand()))
    }
}

// Explicit operators: where_(("age", op::GT, 18)) or where_(("age", ">", 18))
impl<T, O> IntoCondition for (&str, O, T)
where
    T: IntoOperand,
    O: IntoOperator,
{
    fn into_condition(self) -> Result<(String, Operator, Operand)> {
        Ok((
            self.0.to_string(),
            self.1.into_operator()?,
            self.2.into_operand(),
        ))
    }
}

/// One WHERE/HAVING condition and its connective to the previous condition
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub operand: Operand,
    pub connector: Connector,
}

impl Predicate {
    /// Build a predicate, normalizing the operand to the operator's shape.
    ///
    /// A two-element list is accepted for `BETWEEN`, and a bound NULL is
    /// accepted for `IS`. Anything else that does not fit is rejected.
    pub fn new(
        column: impl Into<String>,
        operator: Operator,
        operand: Operand,
        connector: Connector,
    ) -> Result<Self> {
        let column = column.into();
        if column.trim().is_empty() {
            return Err(Error::invalid_query("Condition column must not be empty"));
        }

        let operand = match (operator.arity(), operand) {
            (Arity::Range, Operand::List(values)) => {
                let count = values.len();
                let mut values = values.into_iter();
                match (values.next(), values.next()) {
                    (Some(low), Some(high)) if count == 2 => Operand::Range(low, high),
                    _ => {
                        return Err(Error::invalid_query(format!(
                            "{} on '{}' requires exactly two values, got {}",
                            operator, column, count
                        )));
                    }
                }
            }
            (Arity::Null, Operand::Single(Value::Null)) => Operand::Null,
            (Arity::Null, Operand::Single(value)) => {
                return Err(Error::sql_generation(format!(
                    "{} on '{}' only accepts NULL, got {}",
                    operator,
                    column,
                    value.type_name()
                )));
            }
            (_, operand) => operand,
        };

        let predicate = Self {
            column,
            operator,
            operand,
            connector,
        };
        predicate.validate()?;
        Ok(predicate)
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>, connector: Connector) -> Self {
        Self {
            column: column.into(),
            operator: Operator::Is,
            operand: Operand::Null,
            connector,
        }
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: impl Into<String>, connector: Connector) -> Self {
        Self {
            column: column.into(),
            operator: Operator::IsNot,
            operand: Operand::Null,
            connector,
        }
    }

    /// Check that the operand has the shape the operator renders
    pub fn validate(&self) -> Result<()> {
        match (self.operator.arity(), &self.operand) {
            (Arity::Single, Operand::Single(_))
            | (Arity::Range, Operand::Range(..))
            | (Arity::Null, Operand::Null) => Ok(()),
            (Arity::List, Operand::List(values)) if !values.is_empty() => Ok(()),
            (Arity::List, Operand::List(_)) => Err(Error::invalid_query(format!(
                "{} on '{}' requires a non-empty list",
                self.operator, self.column
            ))),
            (Arity::Null, operand) => Err(Error::sql_generation(format!(
                "{} on '{}' only accepts NULL, got {}",
                self.operator,
                self.column,
                operand.describe()
            ))),
            (_, operand) => Err(Error::invalid_query(format!(
                "{} on '{}' cannot take {}",
                self.operator,
                self.column,
                operand.describe()
            ))),
        }
    }
}

/// Trait to convert various types into columns
pub trait IntoColumns {
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(|s| s.to_string()).collect()
    }
}

// For tuples
impl IntoColumns for (&str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string(), self.2.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![
            self.0.to_string(),
            self.1.to_string(),
            self.2.to_string(),
            self.3.to_string(),
        ]
    }
}

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Right => write!(f, "RIGHT"),
        }
    }
}

/// A JOIN clause: `<KIND> JOIN <table> ON <left> <op> <right>`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub left_column: String,
    pub operator: Operator,
    pub right_column: String,
}

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// An ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub column: String,
    pub direction: SortDirection,
}

/// A relation to fetch after the primary query runs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EagerLoad {
    /// Load the related rows
    Relation(String),
    /// Load only the number of related rows
    Count(String),
}

impl EagerLoad {
    /// Relation name as recorded
    pub fn relation(&self) -> &str {
        match self {
            EagerLoad::Relation(name) | EagerLoad::Count(name) => name,
        }
    }

    /// Key under which a resolver should attach the result,
    /// e.g. `comments` or `comments_count`
    pub fn key(&self) -> String {
        match self {
            EagerLoad::Relation(name) => name.clone(),
            EagerLoad::Count(name) => format!("{}_count", name),
        }
    }
}
