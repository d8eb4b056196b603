//! Operator catalog
//!
//! The closed set of operators an expression tree can compose. Every
//! operator is a `static` so the catalog is built at compile time and read
//! without locking. Dialects map operator names to SQL templates; the
//! catalog itself knows nothing about SQL text.

use std::fmt;

use crate::error::{QueryError, QueryResult};
use crate::types::TypeTag;

/// Information about an operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamInfo {
    /// Operand name (for error messages)
    pub name: &'static str,
    /// Accepted tags (empty means any tag)
    pub accepts: &'static [TypeTag],
}

impl ParamInfo {
    pub const fn new(name: &'static str, accepts: &'static [TypeTag]) -> Self {
        Self { name, accepts }
    }

    pub const fn any(name: &'static str) -> Self {
        Self { name, accepts: &[] }
    }

    pub fn accepts(&self, tag: TypeTag) -> bool {
        self.accepts.is_empty() || self.accepts.iter().any(|t| tag.can_coerce_to(*t))
    }

    fn expected(&self) -> String {
        if self.accepts.is_empty() {
            return "any".to_string();
        }
        self.accepts
            .iter()
            .map(|t| t.display_name())
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// Result type of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Fixed(TypeTag),
    /// Same tag as the first operand
    SameAsSubject,
    /// Same tag as the operand at this 0-based index
    SameAsOperand(usize),
}

/// Identity of a catalog operator, for exhaustive dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Get,
    GetText,
    Contains,
    ContainsKey,
    Concat,
    Size,
    Keys,
    Elements,
    TypeOf,
    BuildObject,
    Set,
    DeleteKey,
    DeleteIndex,
    DeletePath,
    CastText,
    CastInteger,
    CastBigInt,
    CastNumeric,
    CastBoolean,
    Eq,
    Ne,
    And,
    Or,
    Not,
    IsNull,
    IsNotNull,
    In,
    Coalesce,
    CaseWhen,
}

/// A named operator with its operand contract.
#[derive(Debug, PartialEq, Eq)]
pub struct Operator {
    pub kind: OperatorKind,
    pub name: &'static str,
    pub description: &'static str,
    /// Operand slots. Variadic operators cycle through these past the end.
    pub params: &'static [ParamInfo],
    pub result_type: ResultType,
    pub min_args: usize,
    /// Maximum operands (None = variadic)
    pub max_args: Option<usize>,
}

impl Operator {
    pub fn check_arity(&self, arg_count: usize) -> QueryResult<()> {
        let too_few = arg_count < self.min_args;
        let too_many = self.max_args.is_some_and(|max| arg_count > max);
        if too_few || too_many {
            return Err(QueryError::OperatorArityMismatch {
                operator: self.name,
                expected: self.arity_description(),
                actual: arg_count,
            });
        }
        Ok(())
    }

    pub fn check_operand(&self, index: usize, tag: TypeTag) -> QueryResult<()> {
        let Some(param) = self.param_at(index) else {
            return Ok(());
        };

        if !param.accepts(tag) {
            return Err(QueryError::TypeMismatch {
                operator: self.name,
                param: param.name,
                expected: param.expected(),
                actual: tag.display_name().to_string(),
            });
        }
        Ok(())
    }

    /// Tag produced when applied to operands with these tags.
    pub fn result_tag(&self, operands: &[TypeTag]) -> TypeTag {
        let operand = |index: usize| operands.get(index).copied().unwrap_or(TypeTag::Null);
        match self.result_type {
            ResultType::Fixed(tag) => tag,
            ResultType::SameAsSubject => operand(0),
            ResultType::SameAsOperand(index) => operand(index),
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.max_args.is_none()
    }

    fn param_at(&self, index: usize) -> Option<&ParamInfo> {
        if self.params.is_empty() {
            return None;
        }
        if index < self.params.len() {
            return self.params.get(index);
        }
        if self.is_variadic() {
            return self.params.get(index % self.params.len());
        }
        None
    }

    fn arity_description(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => format!("{}", max),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

const JSON: &[TypeTag] = &[TypeTag::Json];
const TEXT: &[TypeTag] = &[TypeTag::Text];
const INTEGER: &[TypeTag] = &[TypeTag::Integer];
const BOOLEAN: &[TypeTag] = &[TypeTag::Boolean];
const TEXT_ARRAY: &[TypeTag] = &[TypeTag::TextArray];
const KEY: &[TypeTag] = &[TypeTag::Text, TypeTag::Integer, TypeTag::TextArray];
const COLLECTION: &[TypeTag] = &[TypeTag::Json, TypeTag::Array];
const VALUE_LIST: &[TypeTag] = &[TypeTag::ValueList];

// JSON navigation

pub static GET: Operator = Operator {
    kind: OperatorKind::Get,
    name: "GET",
    description: "Value at a key, index or path",
    params: &[ParamInfo::new("subject", JSON), ParamInfo::new("key", KEY)],
    result_type: ResultType::Fixed(TypeTag::Json),
    min_args: 2,
    max_args: Some(2),
};

pub static GET_TEXT: Operator = Operator {
    kind: OperatorKind::GetText,
    name: "GET_TEXT",
    description: "Value at a key, index or path, as text",
    params: &[ParamInfo::new("subject", JSON), ParamInfo::new("key", KEY)],
    result_type: ResultType::Fixed(TypeTag::Text),
    min_args: 2,
    max_args: Some(2),
};

pub static CONTAINS: Operator = Operator {
    kind: OperatorKind::Contains,
    name: "CONTAINS",
    description: "Structural containment",
    params: &[ParamInfo::new("subject", JSON), ParamInfo::new("other", JSON)],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 2,
    max_args: Some(2),
};

pub static CONTAINS_KEY: Operator = Operator {
    kind: OperatorKind::ContainsKey,
    name: "CONTAINS_KEY",
    description: "Top-level key or string element exists",
    params: &[ParamInfo::new("subject", JSON), ParamInfo::new("key", TEXT)],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 2,
    max_args: Some(2),
};

pub static CONCAT: Operator = Operator {
    kind: OperatorKind::Concat,
    name: "CONCAT",
    description: "Concatenate arrays or merge objects",
    params: &[
        ParamInfo::new("subject", COLLECTION),
        ParamInfo::new("other", COLLECTION),
    ],
    result_type: ResultType::SameAsSubject,
    min_args: 2,
    max_args: Some(2),
};

pub static SIZE: Operator = Operator {
    kind: OperatorKind::Size,
    name: "SIZE",
    description: "Length of a JSON array",
    params: &[ParamInfo::new("subject", JSON)],
    result_type: ResultType::Fixed(TypeTag::Integer),
    min_args: 1,
    max_args: Some(1),
};

pub static KEYS: Operator = Operator {
    kind: OperatorKind::Keys,
    name: "KEYS",
    description: "Top-level keys of a JSON object",
    params: &[ParamInfo::new("subject", JSON)],
    result_type: ResultType::Fixed(TypeTag::Text),
    min_args: 1,
    max_args: Some(1),
};

pub static ELEMENTS: Operator = Operator {
    kind: OperatorKind::Elements,
    name: "ELEMENTS",
    description: "Elements of a JSON array",
    params: &[ParamInfo::new("subject", JSON)],
    result_type: ResultType::Fixed(TypeTag::Json),
    min_args: 1,
    max_args: Some(1),
};

pub static TYPEOF: Operator = Operator {
    kind: OperatorKind::TypeOf,
    name: "TYPEOF",
    description: "JSON type name of a value",
    params: &[ParamInfo::new("subject", JSON)],
    result_type: ResultType::Fixed(TypeTag::Text),
    min_args: 1,
    max_args: Some(1),
};

pub static BUILD_OBJECT: Operator = Operator {
    kind: OperatorKind::BuildObject,
    name: "BUILD_OBJECT",
    description: "Build a JSON object from key/value pairs",
    params: &[ParamInfo::new("key", TEXT), ParamInfo::any("value")],
    result_type: ResultType::Fixed(TypeTag::Json),
    min_args: 2,
    max_args: None, // Variadic pairs
};

// JSON mutation

pub static SET: Operator = Operator {
    kind: OperatorKind::Set,
    name: "SET",
    description: "Replace the value at a path",
    params: &[
        ParamInfo::new("subject", JSON),
        ParamInfo::new("path", TEXT_ARRAY),
        ParamInfo::new("value", JSON),
    ],
    result_type: ResultType::Fixed(TypeTag::Json),
    min_args: 3,
    max_args: Some(3),
};

pub static DELETE_KEY: Operator = Operator {
    kind: OperatorKind::DeleteKey,
    name: "DELETE_KEY",
    description: "Remove a key or matching string elements",
    params: &[ParamInfo::new("subject", JSON), ParamInfo::new("key", TEXT)],
    result_type: ResultType::Fixed(TypeTag::Json),
    min_args: 2,
    max_args: Some(2),
};

pub static DELETE_INDEX: Operator = Operator {
    kind: OperatorKind::DeleteIndex,
    name: "DELETE_INDEX",
    description: "Remove an array element by index",
    params: &[ParamInfo::new("subject", JSON), ParamInfo::new("index", INTEGER)],
    result_type: ResultType::Fixed(TypeTag::Json),
    min_args: 2,
    max_args: Some(2),
};

pub static DELETE_PATH: Operator = Operator {
    kind: OperatorKind::DeletePath,
    name: "DELETE_PATH",
    description: "Remove the value at a path",
    params: &[
        ParamInfo::new("subject", JSON),
        ParamInfo::new("path", TEXT_ARRAY),
    ],
    result_type: ResultType::Fixed(TypeTag::Json),
    min_args: 2,
    max_args: Some(2),
};

// Casts

pub static CAST_TEXT: Operator = Operator {
    kind: OperatorKind::CastText,
    name: "CAST_TEXT",
    description: "Cast to text",
    params: &[ParamInfo::any("value")],
    result_type: ResultType::Fixed(TypeTag::Text),
    min_args: 1,
    max_args: Some(1),
};

pub static CAST_INTEGER: Operator = Operator {
    kind: OperatorKind::CastInteger,
    name: "CAST_INTEGER",
    description: "Cast to integer",
    params: &[ParamInfo::any("value")],
    result_type: ResultType::Fixed(TypeTag::Integer),
    min_args: 1,
    max_args: Some(1),
};

pub static CAST_BIGINT: Operator = Operator {
    kind: OperatorKind::CastBigInt,
    name: "CAST_BIGINT",
    description: "Cast to bigint",
    params: &[ParamInfo::any("value")],
    result_type: ResultType::Fixed(TypeTag::Integer),
    min_args: 1,
    max_args: Some(1),
};

pub static CAST_NUMERIC: Operator = Operator {
    kind: OperatorKind::CastNumeric,
    name: "CAST_NUMERIC",
    description: "Cast to numeric",
    params: &[ParamInfo::any("value")],
    result_type: ResultType::Fixed(TypeTag::Number),
    min_args: 1,
    max_args: Some(1),
};

pub static CAST_BOOLEAN: Operator = Operator {
    kind: OperatorKind::CastBoolean,
    name: "CAST_BOOLEAN",
    description: "Cast to boolean",
    params: &[ParamInfo::any("value")],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 1,
    max_args: Some(1),
};

// Comparison and logic

pub static EQ: Operator = Operator {
    kind: OperatorKind::Eq,
    name: "EQ",
    description: "Equality",
    params: &[ParamInfo::any("left"), ParamInfo::any("right")],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 2,
    max_args: Some(2),
};

pub static NE: Operator = Operator {
    kind: OperatorKind::Ne,
    name: "NE",
    description: "Inequality",
    params: &[ParamInfo::any("left"), ParamInfo::any("right")],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 2,
    max_args: Some(2),
};

pub static AND: Operator = Operator {
    kind: OperatorKind::And,
    name: "AND",
    description: "Conjunction",
    params: &[ParamInfo::new("condition", BOOLEAN)],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 2,
    max_args: None,
};

pub static OR: Operator = Operator {
    kind: OperatorKind::Or,
    name: "OR",
    description: "Disjunction",
    params: &[ParamInfo::new("condition", BOOLEAN)],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 2,
    max_args: None,
};

pub static NOT: Operator = Operator {
    kind: OperatorKind::Not,
    name: "NOT",
    description: "Negation",
    params: &[ParamInfo::new("condition", BOOLEAN)],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 1,
    max_args: Some(1),
};

pub static IS_NULL: Operator = Operator {
    kind: OperatorKind::IsNull,
    name: "IS_NULL",
    description: "SQL null check",
    params: &[ParamInfo::any("value")],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 1,
    max_args: Some(1),
};

pub static IS_NOT_NULL: Operator = Operator {
    kind: OperatorKind::IsNotNull,
    name: "IS_NOT_NULL",
    description: "SQL not-null check",
    params: &[ParamInfo::any("value")],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 1,
    max_args: Some(1),
};

pub static IN: Operator = Operator {
    kind: OperatorKind::In,
    name: "IN",
    description: "Membership in a list of values",
    params: &[ParamInfo::any("value"), ParamInfo::new("values", VALUE_LIST)],
    result_type: ResultType::Fixed(TypeTag::Boolean),
    min_args: 2,
    max_args: Some(2),
};

pub static COALESCE: Operator = Operator {
    kind: OperatorKind::Coalesce,
    name: "COALESCE",
    description: "First non-null value",
    params: &[ParamInfo::any("values")],
    result_type: ResultType::SameAsSubject,
    min_args: 1,
    max_args: None,
};

pub static CASE_WHEN: Operator = Operator {
    kind: OperatorKind::CaseWhen,
    name: "CASE_WHEN",
    description: "Conditional value; only the chosen branch is evaluated",
    params: &[
        ParamInfo::new("condition", BOOLEAN),
        ParamInfo::any("then"),
        ParamInfo::any("otherwise"),
    ],
    result_type: ResultType::SameAsOperand(1),
    min_args: 3,
    max_args: Some(3),
};

/// All catalog operators
pub static OPERATORS: &[&Operator] = &[
    // JSON navigation
    &GET,
    &GET_TEXT,
    &CONTAINS,
    &CONTAINS_KEY,
    &CONCAT,
    &SIZE,
    &KEYS,
    &ELEMENTS,
    &TYPEOF,
    &BUILD_OBJECT,
    // JSON mutation
    &SET,
    &DELETE_KEY,
    &DELETE_INDEX,
    &DELETE_PATH,
    // Casts
    &CAST_TEXT,
    &CAST_INTEGER,
    &CAST_BIGINT,
    &CAST_NUMERIC,
    &CAST_BOOLEAN,
    // Comparison and logic
    &EQ,
    &NE,
    &AND,
    &OR,
    &NOT,
    &IS_NULL,
    &IS_NOT_NULL,
    &IN,
    &COALESCE,
    &CASE_WHEN,
];

/// Look up an operator by name (case-insensitive)
pub fn lookup_operator(name: &str) -> Option<&'static Operator> {
    OPERATORS
        .iter()
        .copied()
        .find(|op| op.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_operator() {
        assert!(lookup_operator("GET").is_some());
        assert!(lookup_operator("get_text").is_some());
        assert!(lookup_operator("nonexistent").is_none());
    }

    #[test]
    fn test_names_are_unique() {
        for (i, a) in OPERATORS.iter().enumerate() {
            for b in &OPERATORS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_arity_check() {
        assert!(SET.check_arity(3).is_ok());
        assert!(SET.check_arity(2).is_err());

        assert!(AND.check_arity(2).is_ok());
        assert!(AND.check_arity(7).is_ok()); // Variadic
        assert!(matches!(
            AND.check_arity(1),
            Err(QueryError::OperatorArityMismatch { actual: 1, .. })
        ));
    }

    #[test]
    fn test_type_check() {
        assert!(GET.check_operand(1, TypeTag::Text).is_ok());
        assert!(GET.check_operand(1, TypeTag::TextArray).is_ok());
        assert!(GET.check_operand(0, TypeTag::Text).is_err());
        assert!(SIZE.check_operand(0, TypeTag::Null).is_ok());

        // Variadic operands cycle through the declared slots
        assert!(BUILD_OBJECT.check_operand(2, TypeTag::Text).is_ok());
        assert!(BUILD_OBJECT.check_operand(2, TypeTag::Integer).is_err());
        assert!(BUILD_OBJECT.check_operand(3, TypeTag::Integer).is_ok());
    }

    #[test]
    fn test_result_tag() {
        assert_eq!(CONCAT.result_tag(&[TypeTag::TextArray]), TypeTag::TextArray);
        assert_eq!(SIZE.result_tag(&[TypeTag::Json]), TypeTag::Integer);
        assert_eq!(
            CASE_WHEN.result_tag(&[TypeTag::Boolean, TypeTag::Text, TypeTag::Null]),
            TypeTag::Text
        );
        assert_eq!(COALESCE.result_tag(&[]), TypeTag::Null);
    }

    #[test]
    fn test_kinds_are_unique() {
        for (i, a) in OPERATORS.iter().enumerate() {
            for b in &OPERATORS[i + 1..] {
                assert_ne!(a.kind, b.kind, "{} and {}", a, b);
            }
        }
    }
}
