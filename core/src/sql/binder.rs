//! Parameter binding.
//!
//! Attaches every compiled parameter to a 1-based statement position with a
//! resolved SQL type. Whether a collection binds as one array or as several
//! alternatives is decided by the constant's declared intent
//! ([`ConstantValue::ArrayValue`] vs [`ConstantValue::ValueList`]), never by
//! looking at the values.

use std::convert::Infallible;

use serde_json::Value;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::expr::{Constant, ConstantValue};
use crate::sql::serializer::CompiledSql;
use crate::types::SqlType;

/// Value attached to one position.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    /// SQL NULL
    Null,
    Scalar(Value),
    /// A single array-typed parameter
    Array(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamBinding {
    /// 1-based placeholder position
    pub position: usize,
    pub value: BoundValue,
    pub sql_type: SqlType,
}

/// SQL text with every placeholder bound.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub bindings: Vec<ParamBinding>,
}

impl BoundStatement {
    /// Hand the statement to an execution layer.
    pub fn execute_with<S: StatementSink>(&self, sink: &mut S) -> Result<S::Statement, S::Error> {
        sink.prepare(&self.sql, &self.bindings)
    }
}

/// Execution layer that turns bound SQL into a prepared statement.
pub trait StatementSink {
    type Statement;
    type Error;

    fn prepare(
        &mut self,
        sql: &str,
        bindings: &[ParamBinding],
    ) -> Result<Self::Statement, Self::Error>;
}

/// Sink that keeps every statement it is given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    statements: Vec<BoundStatement>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> &[BoundStatement] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<BoundStatement> {
        self.statements
    }
}

impl StatementSink for RecordingSink {
    /// Index of the recorded statement
    type Statement = usize;
    type Error = Infallible;

    fn prepare(&mut self, sql: &str, bindings: &[ParamBinding]) -> Result<usize, Infallible> {
        self.statements.push(BoundStatement {
            sql: sql.to_string(),
            bindings: bindings.to_vec(),
        });
        Ok(self.statements.len() - 1)
    }
}

/// Resolves SQL types for compiled parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterBinder;

impl ParameterBinder {
    pub fn new() -> Self {
        Self
    }

    pub fn bind(&self, compiled: CompiledSql) -> QueryResult<BoundStatement> {
        let bindings = self.bind_params(&compiled.params)?;
        debug!(
            params = compiled.params.len(),
            positions = bindings.len(),
            "bound statement"
        );
        Ok(BoundStatement {
            sql: compiled.sql,
            bindings,
        })
    }

    /// Bind parameters in order, starting at position 1.
    pub fn bind_params(&self, params: &[Constant]) -> QueryResult<Vec<ParamBinding>> {
        let mut bindings = Vec::with_capacity(params.len());
        for constant in params {
            let position = bindings.len() + 1;
            match constant.value() {
                ConstantValue::ValueList(values) => {
                    for (i, value) in values.iter().enumerate() {
                        bindings.push(bind_scalar(
                            position + i,
                            value,
                            constant.declared_type(),
                        )?);
                    }
                }
                ConstantValue::ArrayValue(values) => {
                    bindings.push(bind_array(position, values, constant.declared_type())?);
                }
                ConstantValue::Scalar(value) => {
                    bindings.push(bind_scalar(position, value, constant.declared_type())?);
                }
                ConstantValue::Null => {
                    let sql_type = constant.declared_type().cloned().ok_or_else(|| {
                        QueryError::UnresolvedParameterType {
                            position,
                            shape: "null".to_string(),
                        }
                    })?;
                    bindings.push(ParamBinding {
                        position,
                        value: BoundValue::Null,
                        sql_type,
                    });
                }
            }
        }
        Ok(bindings)
    }
}

fn bind_scalar(
    position: usize,
    value: &Value,
    declared: Option<&SqlType>,
) -> QueryResult<ParamBinding> {
    let sql_type = match declared {
        Some(sql_type) => sql_type.clone(),
        None => default_scalar_type(value).ok_or_else(|| QueryError::UnresolvedParameterType {
            position,
            shape: shape_of(value).to_string(),
        })?,
    };
    Ok(ParamBinding {
        position,
        value: BoundValue::Scalar(value.clone()),
        sql_type,
    })
}

fn bind_array(
    position: usize,
    values: &[Value],
    declared: Option<&SqlType>,
) -> QueryResult<ParamBinding> {
    let sql_type = match declared {
        // A jsonb array is one JSON document, not a SQL array
        Some(SqlType::Jsonb) => {
            return Ok(ParamBinding {
                position,
                value: BoundValue::Scalar(Value::Array(values.to_vec())),
                sql_type: SqlType::Jsonb,
            });
        }
        Some(sql_type) => sql_type.clone(),
        None => SqlType::array_of(infer_element_type(position, values)?),
    };
    Ok(ParamBinding {
        position,
        value: BoundValue::Array(values.to_vec()),
        sql_type,
    })
}

fn default_scalar_type(value: &Value) -> Option<SqlType> {
    match value {
        Value::Bool(_) => Some(SqlType::Boolean),
        Value::Number(n) if n.is_f64() => Some(SqlType::Double),
        Value::Number(_) => Some(SqlType::BigInt),
        Value::String(_) => Some(SqlType::Text),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn infer_element_type(position: usize, values: &[Value]) -> QueryResult<SqlType> {
    let unresolved = |shape: &str| QueryError::UnresolvedParameterType {
        position,
        shape: shape.to_string(),
    };

    let mut element: Option<SqlType> = None;
    for value in values {
        let current = default_scalar_type(value)
            .ok_or_else(|| unresolved(&format!("array containing {}", shape_of(value))))?;
        element = match element {
            None => Some(current),
            Some(prev) if prev == current => Some(prev),
            // Integers and floats together widen to double
            Some(SqlType::BigInt) | Some(SqlType::Double)
                if matches!(current, SqlType::BigInt | SqlType::Double) =>
            {
                Some(SqlType::Double)
            }
            Some(_) => return Err(unresolved("array of mixed element types")),
        };
    }
    element.ok_or_else(|| unresolved("empty array"))
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "json array",
        Value::Object(_) => "json object",
    }
}
