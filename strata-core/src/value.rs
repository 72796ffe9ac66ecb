//! Value types for SQL parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scalar SQL value bound to one positional placeholder.
///
/// Sequences and pairs are not values; they only exist as predicate
/// operands (see [`Operand`](crate::Operand)), so every `Value` maps to
/// exactly one `?` in the compiled text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    /// Raw binary data, bound as a blob
    Bytes(Vec<u8>),
    /// A whole JSON document bound to a single placeholder
    Json(serde_json::Value),
    /// Soft-delete markers and other instants, always UTC
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Column type this value would be stored as, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::I32(_) => "INTEGER",
            Value::I64(_) => "BIGINT",
            Value::F32(_) => "REAL",
            Value::F64(_) => "DOUBLE PRECISION",
            Value::String(_) => "TEXT",
            Value::Bytes(_) => "BYTEA",
            Value::Json(_) => "JSON",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }

    /// JSON form of the value. Non-finite floats become `null` and
    /// timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        let float = |f: f64| serde_json::Number::from_f64(f).map_or(Json::Null, Json::Number);
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::I32(i) => Json::from(*i),
            Value::I64(i) => Json::from(*i),
            Value::F32(f) => float(f64::from(*f)),
            Value::F64(f) => float(*f),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => bytes.iter().copied().map(Json::from).collect(),
            Value::Json(doc) => doc.clone(),
            Value::Timestamp(ts) => Json::String(ts.to_rfc3339()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

value_from!(
    () => |_unit| Value::Null,
    bool => |v| Value::Bool(v),
    i32 => |v| Value::I32(v),
    i64 => |v| Value::I64(v),
    u32 => |v| Value::I64(i64::from(v)),
    f32 => |v| Value::F32(v),
    f64 => |v| Value::F64(v),
    String => |v| Value::String(v),
    &str => |v| Value::String(v.to_owned()),
    &String => |v| Value::String(v.clone()),
    Vec<u8> => |v| Value::Bytes(v),
    serde_json::Value => |v| Value::Json(v),
    DateTime<Utc> => |v| Value::Timestamp(v),
);

/// `None` binds as NULL
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
