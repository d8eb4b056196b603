//! SQL types and the coarse type tags used to check operator operands.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL type a column or bound parameter is declared with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Jsonb,
    Text,
    Integer,
    BigInt,
    Double,
    Numeric,
    Boolean,
    Array(Box<SqlType>),
}

impl SqlType {
    /// `text[]`, the type of every JSON path parameter
    pub fn text_array() -> Self {
        SqlType::Array(Box::new(SqlType::Text))
    }

    pub fn array_of(element: SqlType) -> Self {
        SqlType::Array(Box::new(element))
    }

    /// Element type for array types
    pub fn element(&self) -> Option<&SqlType> {
        match self {
            SqlType::Array(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, SqlType::Array(_))
    }

    /// The SQL spelling of this type, as used in casts.
    pub fn sql_name(&self) -> String {
        match self {
            SqlType::Jsonb => "jsonb".to_string(),
            SqlType::Text => "text".to_string(),
            SqlType::Integer => "integer".to_string(),
            SqlType::BigInt => "bigint".to_string(),
            SqlType::Double => "double precision".to_string(),
            SqlType::Numeric => "numeric".to_string(),
            SqlType::Boolean => "boolean".to_string(),
            SqlType::Array(inner) => format!("{}[]", inner.sql_name()),
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            SqlType::Jsonb => TypeTag::Json,
            SqlType::Text => TypeTag::Text,
            SqlType::Integer | SqlType::BigInt => TypeTag::Integer,
            SqlType::Double | SqlType::Numeric => TypeTag::Number,
            SqlType::Boolean => TypeTag::Boolean,
            SqlType::Array(inner) if **inner == SqlType::Text => TypeTag::TextArray,
            SqlType::Array(_) => TypeTag::Array,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}

/// Coarse type class of an expression.
///
/// Operators declare which tags each operand accepts; expressions report the
/// tag they produce. `Null` is an untyped null literal and fits any operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Json,
    Text,
    Integer,
    Number,
    Boolean,
    TextArray,
    Array,
    /// A list of alternatives, only meaningful as the right side of `IN`
    ValueList,
}

impl TypeTag {
    pub fn display_name(&self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Json => "json",
            TypeTag::Text => "text",
            TypeTag::Integer => "integer",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::TextArray => "text array",
            TypeTag::Array => "array",
            TypeTag::ValueList => "value list",
        }
    }

    /// Check if a value of this tag may be used where `target` is expected.
    ///
    /// - Same tags always fit
    /// - Untyped null fits anything except a value list
    /// - Integer widens to number, text array to array
    pub fn can_coerce_to(&self, target: TypeTag) -> bool {
        if *self == target {
            return true;
        }

        match (self, target) {
            (TypeTag::Null, TypeTag::ValueList) => false,
            (TypeTag::Null, _) => true,
            (TypeTag::Integer, TypeTag::Number) => true,
            (TypeTag::TextArray, TypeTag::Array) => true,
            _ => false,
        }
    }

    /// SQL arrays (not jsonb arrays)
    pub fn is_sql_array(&self) -> bool {
        matches!(self, TypeTag::TextArray | TypeTag::Array)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
