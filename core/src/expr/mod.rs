//! Expression tree over jsonb columns.
//!
//! An [`Expression`] is a column/field reference, a constant, or an operator
//! applied to operand expressions. Operations are validated against the
//! [`catalog`] when they are built, so a tree that exists is well-formed.
//! Trees are immutable; every derived operation returns a new tree and
//! shares the operands of the old one.

pub mod catalog;
mod json;
pub mod path;
mod predicate;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use smallvec::SmallVec;

use crate::config::{ColumnKind, TypeMappings};
use crate::error::{QueryError, QueryResult};
use crate::types::{SqlType, TypeTag};

pub use catalog::{Operator, OperatorKind, ParamInfo, ResultType, lookup_operator};
pub use json::build_object;
pub use path::{PathSegments, normalize, parse_dotted};

/// Identifier shared cheaply between trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(pub Arc<str>);

impl Ident {
    pub fn new(s: impl AsRef<str>) -> Self {
        Ident(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Ident::new(s)
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Ident::new(s)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed column accessor supplied by the schema layer.
pub trait ColumnSource {
    /// Owning table or alias, if the reference is qualified
    fn table(&self) -> Option<&str> {
        None
    }

    fn name(&self) -> &str;

    fn sql_type(&self) -> SqlType;
}

/// Plain column reference for callers without generated accessors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    table: Option<Ident>,
    name: Ident,
    sql_type: SqlType,
}

impl Column {
    pub fn new(name: impl Into<Ident>, sql_type: SqlType) -> Self {
        Self {
            table: None,
            name: name.into(),
            sql_type,
        }
    }

    pub fn qualified(table: impl Into<Ident>, name: impl Into<Ident>, sql_type: SqlType) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
            sql_type,
        }
    }

    pub fn jsonb(name: impl Into<Ident>) -> Self {
        Self::new(name, SqlType::Jsonb)
    }

    /// Resolve a column from the type name it was declared with in the schema.
    ///
    /// `base` is the scalar type of the column, or the element type when the
    /// declared name maps to an array.
    pub fn from_declared(
        name: impl Into<Ident>,
        declared_type: &str,
        base: SqlType,
        mappings: &TypeMappings,
    ) -> Self {
        let sql_type = match mappings.kind_of(declared_type) {
            ColumnKind::Json => SqlType::Jsonb,
            ColumnKind::Array => SqlType::array_of(base),
            ColumnKind::Scalar => base,
        };
        Self::new(name, sql_type)
    }
}

impl ColumnSource for Column {
    fn table(&self) -> Option<&str> {
        self.table.as_ref().map(Ident::as_str)
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn sql_type(&self) -> SqlType {
        self.sql_type.clone()
    }
}

/// Reference to a column, or a field reached through a chain of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathRef {
    owner: Option<Ident>,
    segments: SmallVec<[Ident; 2]>,
    sql_type: SqlType,
}

impl PathRef {
    pub fn new(
        owner: Option<Ident>,
        segments: impl IntoIterator<Item = Ident>,
        sql_type: SqlType,
    ) -> QueryResult<Self> {
        let segments: SmallVec<[Ident; 2]> = segments.into_iter().collect();
        if segments.is_empty() || segments.iter().any(|s| s.as_str().is_empty()) {
            return Err(QueryError::InvalidPath(
                "column reference needs at least one non-empty segment".to_string(),
            ));
        }
        Ok(Self {
            owner,
            segments,
            sql_type,
        })
    }

    pub fn from_column(column: &impl ColumnSource) -> Self {
        Self {
            owner: column.table().map(Ident::new),
            segments: smallvec::smallvec![Ident::new(column.name())],
            sql_type: column.sql_type(),
        }
    }

    pub fn owner(&self) -> Option<&Ident> {
        self.owner.as_ref()
    }

    pub fn segments(&self) -> &[Ident] {
        &self.segments
    }

    pub fn sql_type(&self) -> &SqlType {
        &self.sql_type
    }

    /// Segments joined with `.`, without the owner
    pub fn column_path(&self) -> String {
        self.segments
            .iter()
            .map(Ident::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Owner and segments joined with `.` (for error messages)
    pub fn full_path(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}", owner, self.column_path()),
            None => self.column_path(),
        }
    }
}

/// Literal payload of a constant.
///
/// Collections state their intent up front: an `ArrayValue` is one array
/// value bound as a single parameter, a `ValueList` is a set of alternatives
/// expanded into one parameter per element.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// SQL NULL. A scalar `Value::Null` is the JSON literal when typed jsonb.
    Null,
    Scalar(Value),
    ArrayValue(Vec<Value>),
    ValueList(Vec<Value>),
}

/// A literal, optionally carrying an explicit SQL type.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    value: ConstantValue,
    declared_type: Option<SqlType>,
}

impl Constant {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self {
            value: ConstantValue::Scalar(value.into()),
            declared_type: None,
        }
    }

    /// A scalar bound with `sql_type` regardless of its runtime shape.
    pub fn typed(value: impl Into<Value>, sql_type: SqlType) -> Self {
        Self {
            value: ConstantValue::Scalar(value.into()),
            declared_type: Some(sql_type),
        }
    }

    pub fn jsonb(value: impl Into<Value>) -> Self {
        Self::typed(value, SqlType::Jsonb)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::typed(Value::String(value.into()), SqlType::Text)
    }

    /// A `bigint` literal
    pub fn integer(value: i64) -> Self {
        Self::typed(value, SqlType::BigInt)
    }

    /// An `integer` (int4) literal, the type jsonb array indexes take.
    pub fn int(value: i32) -> Self {
        Self::typed(value, SqlType::Integer)
    }

    /// Untyped SQL NULL
    pub fn null() -> Self {
        Self {
            value: ConstantValue::Null,
            declared_type: None,
        }
    }

    /// SQL NULL bound with `sql_type`
    pub fn sql_null(sql_type: SqlType) -> Self {
        Self {
            value: ConstantValue::Null,
            declared_type: Some(sql_type),
        }
    }

    /// The JSON literal `null`, distinct from SQL NULL.
    pub fn json_null() -> Self {
        Self::jsonb(Value::Null)
    }

    /// One array value; the element type is inferred at bind time.
    pub fn array<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            value: ConstantValue::ArrayValue(values.into_iter().map(Into::into).collect()),
            declared_type: None,
        }
    }

    pub fn typed_array<I, V>(values: I, sql_type: SqlType) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            value: ConstantValue::ArrayValue(values.into_iter().map(Into::into).collect()),
            declared_type: Some(sql_type),
        }
    }

    /// A `text[]` value, the form JSON paths are bound in.
    pub fn text_array<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::typed_array(
            segments.into_iter().map(|s| Value::String(s.into())),
            SqlType::text_array(),
        )
    }

    /// Alternatives for `IN`, expanded into one parameter each.
    pub fn value_list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            value: ConstantValue::ValueList(values.into_iter().map(Into::into).collect()),
            declared_type: None,
        }
    }

    /// Declare the SQL type of this constant (element type for value lists).
    pub fn with_type(mut self, sql_type: SqlType) -> Self {
        self.declared_type = Some(sql_type);
        self
    }

    pub fn value(&self) -> &ConstantValue {
        &self.value
    }

    pub fn declared_type(&self) -> Option<&SqlType> {
        self.declared_type.as_ref()
    }

    /// Number of placeholders this constant occupies once bound.
    pub fn placeholder_count(&self) -> usize {
        match &self.value {
            ConstantValue::ValueList(values) => values.len(),
            _ => 1,
        }
    }

    pub fn tag(&self) -> TypeTag {
        if let ConstantValue::ValueList(_) = self.value {
            return TypeTag::ValueList;
        }
        if let Some(declared) = &self.declared_type {
            return declared.tag();
        }
        match &self.value {
            ConstantValue::Null => TypeTag::Null,
            ConstantValue::Scalar(value) => value_tag(value),
            ConstantValue::ArrayValue(values) => {
                if !values.is_empty() && values.iter().all(Value::is_string) {
                    TypeTag::TextArray
                } else {
                    TypeTag::Array
                }
            }
            ConstantValue::ValueList(_) => TypeTag::ValueList,
        }
    }
}

fn value_tag(value: &Value) -> TypeTag {
    match value {
        Value::Null => TypeTag::Null,
        Value::Bool(_) => TypeTag::Boolean,
        Value::Number(n) if n.is_f64() => TypeTag::Number,
        Value::Number(_) => TypeTag::Integer,
        Value::String(_) => TypeTag::Text,
        Value::Array(_) | Value::Object(_) => TypeTag::Json,
    }
}

/// An operator applied to ordered operands.
#[derive(Debug, PartialEq)]
pub struct Operation {
    operator: &'static Operator,
    operands: Vec<Expression>,
    result: TypeTag,
}

impl Operation {
    pub fn operator(&self) -> &'static Operator {
        self.operator
    }

    pub fn operands(&self) -> &[Expression] {
        &self.operands
    }

    /// First operand, conventionally the value being operated on
    pub fn subject(&self) -> Option<&Expression> {
        self.operands.first()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Path(PathRef),
    Constant(Constant),
    Operation(Arc<Operation>),
}

impl Expression {
    pub fn column(column: &impl ColumnSource) -> Self {
        Expression::Path(PathRef::from_column(column))
    }

    pub fn constant(constant: Constant) -> Self {
        Expression::Constant(constant)
    }

    /// An untyped scalar literal
    pub fn value(value: impl Into<Value>) -> Self {
        Expression::Constant(Constant::scalar(value))
    }

    /// Apply `operator` to `operands`, checking arity and operand types.
    pub fn operation(operator: &'static Operator, operands: Vec<Expression>) -> QueryResult<Self> {
        operator.check_arity(operands.len())?;

        for (index, operand) in operands.iter().enumerate() {
            operator.check_operand(index, operand.type_tag())?;
            if let Expression::Constant(c) = operand
                && let ConstantValue::ValueList(values) = c.value()
                && values.is_empty()
            {
                return Err(QueryError::EmptyValueList(operator.name));
            }
        }

        let tags: Vec<TypeTag> = operands.iter().map(Expression::type_tag).collect();
        let result = operator.result_tag(&tags);
        Ok(Expression::Operation(Arc::new(Operation {
            operator,
            operands,
            result,
        })))
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Expression::Path(path) => path.sql_type().tag(),
            Expression::Constant(constant) => constant.tag(),
            Expression::Operation(op) => op.result,
        }
    }

    /// Declared SQL type, for paths and typed constants
    pub fn declared_type(&self) -> Option<&SqlType> {
        match self {
            Expression::Path(path) => Some(path.sql_type()),
            Expression::Constant(constant) => constant.declared_type(),
            Expression::Operation(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathRef> {
        match self {
            Expression::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Expression::Constant(constant) => Some(constant),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            Expression::Operation(op) => Some(op),
            _ => None,
        }
    }

    /// Check if this is an application of `operator`
    pub fn is_operation(&self, operator: &Operator) -> bool {
        self.as_operation()
            .is_some_and(|op| std::ptr::eq(op.operator, operator) || op.operator == operator)
    }
}

impl From<PathRef> for Expression {
    fn from(path: PathRef) -> Self {
        Expression::Path(path)
    }
}

impl From<Constant> for Expression {
    fn from(constant: Constant) -> Self {
        Expression::Constant(constant)
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::value(value)
    }
}

impl From<&Column> for Expression {
    fn from(column: &Column) -> Self {
        Expression::column(column)
    }
}
