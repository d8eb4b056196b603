//! In-memory evaluation of expressions.
//!
//! Interprets an [`Expression`](crate::expr::Expression) against a single
//! row using PostgreSQL jsonb semantics and SQL three-valued logic. Lets
//! predicates be checked without a database.

mod engine;
mod jsonb;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

pub use engine::Evaluator;

/// A SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// SQL NULL
    Null,
    Json(Value),
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// SQL array
    Array(Vec<Value>),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Json(_) => "jsonb",
            Datum::Text(_) => "text",
            Datum::Integer(_) => "integer",
            Datum::Number(_) => "numeric",
            Datum::Boolean(_) => "boolean",
            Datum::Array(_) => "array",
        }
    }

    /// JSON form of this value; SQL NULL becomes the JSON literal `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Datum::Null => Value::Null,
            Datum::Json(v) => v.clone(),
            Datum::Text(s) => Value::String(s.clone()),
            Datum::Integer(i) => Value::from(*i),
            Datum::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Datum::Boolean(b) => Value::Bool(*b),
            Datum::Array(items) => Value::Array(items.clone()),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Json(v) => write!(f, "{}", v),
            Datum::Text(s) => write!(f, "{}", s),
            Datum::Integer(i) => write!(f, "{}", i),
            Datum::Number(n) => write!(f, "{}", n),
            Datum::Boolean(b) => write!(f, "{}", b),
            Datum::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "{{{}}}", parts.join(","))
            }
        }
    }
}

/// Column values of one row. Absent columns read as SQL NULL.
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub data: HashMap<String, Datum>,
}

impl Row {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Datum) {
        self.data.insert(column.into(), value);
    }

    pub fn with(mut self, column: impl Into<String>, value: Datum) -> Self {
        self.insert(column, value);
        self
    }

    pub fn with_json(self, column: impl Into<String>, value: Value) -> Self {
        self.with(column, Datum::Json(value))
    }

    pub fn get(&self, column: &str) -> Option<&Datum> {
        self.data.get(column)
    }
}
