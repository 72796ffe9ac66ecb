//! Column/value payloads for INSERT and UPDATE

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{Error, Result, Value};

/// Trait for types that can be converted to an ordered column/value record
///
/// # Examples
/// ```
/// use strata_core::{table, Value};
///
/// let compiled = table("users")
///     .to_insert_sql([("name", Value::from("John")), ("age", Value::from(30))])
///     .unwrap();
/// assert_eq!(compiled.sql, "INSERT INTO users (name, age) VALUES (?, ?)");
/// ```
pub trait IntoRecord {
    fn into_record(self) -> Result<Vec<(String, Value)>>;
}

/// Reject empty records and repeated columns
fn checked(record: Vec<(String, Value)>) -> Result<Vec<(String, Value)>> {
    if record.is_empty() {
        return Err(Error::invalid_query("Payload requires at least one column"));
    }
    {
        let mut seen = HashSet::new();
        for (column, _) in &record {
            if column.trim().is_empty() {
                return Err(Error::invalid_query("Payload column must not be empty"));
            }
            if !seen.insert(column.as_str()) {
                return Err(Error::invalid_query(format!(
                    "Payload column '{}' appears more than once",
                    column
                )));
            }
        }
    }
    Ok(record)
}

impl IntoRecord for Vec<(String, Value)> {
    fn into_record(self) -> Result<Vec<(String, Value)>> {
        checked(self)
    }
}

impl IntoRecord for Vec<(&str, Value)> {
    fn into_record(self) -> Result<Vec<(String, Value)>> {
        checked(
            self.into_iter()
                .map(|(column, value)| (column.to_string(), value))
                .collect(),
        )
    }
}

impl<const N: usize> IntoRecord for [(&str, Value); N] {
    fn into_record(self) -> Result<Vec<(String, Value)>> {
        checked(
            self.into_iter()
                .map(|(column, value)| (column.to_string(), value))
                .collect(),
        )
    }
}

impl IntoRecord for BTreeMap<String, Value> {
    fn into_record(self) -> Result<Vec<(String, Value)>> {
        checked(self.into_iter().collect())
    }
}

/// Columns are emitted in sorted order so the statement text is stable
impl IntoRecord for HashMap<String, Value> {
    fn into_record(self) -> Result<Vec<(String, Value)>> {
        let mut record: Vec<(String, Value)> = self.into_iter().collect();
        record.sort_by(|a, b| a.0.cmp(&b.0));
        checked(record)
    }
}

impl IntoRecord for serde_json::Map<String, serde_json::Value> {
    fn into_record(self) -> Result<Vec<(String, Value)>> {
        checked(
            self.into_iter()
                .map(|(column, value)| (column, json_to_value(value)))
                .collect(),
        )
    }
}

/// Only JSON objects are records; any other JSON value is rejected
impl IntoRecord for serde_json::Value {
    fn into_record(self) -> Result<Vec<(String, Value)>> {
        match self {
            serde_json::Value::Object(map) => map.into_record(),
            other => Err(Error::invalid_query(format!(
                "Unsupported payload type: expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::I64(i),
            None => n.as_f64().map(Value::F64).unwrap_or(Value::Json(n.into())),
        },
        serde_json::Value::String(s) => Value::String(s),
        nested => Value::Json(nested),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
