use serde_json::Value;

use super::jsonb;
use super::{Datum, Row};
use crate::error::{QueryError, QueryResult};
use crate::expr::catalog::{Operator, OperatorKind};
use crate::expr::{Constant, ConstantValue, Expression, Operation};
use crate::types::SqlType;

/// Evaluates expressions against rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, expr: &Expression, row: &Row) -> QueryResult<Datum> {
        match expr {
            Expression::Path(path) => Ok(row
                .get(&path.column_path())
                .cloned()
                .unwrap_or(Datum::Null)),
            Expression::Constant(constant) => self.evaluate_constant(constant),
            Expression::Operation(op) => self.evaluate_operation(op, row),
        }
    }

    /// Three-valued result of a predicate; `None` is SQL NULL.
    pub fn evaluate_bool(&self, expr: &Expression, row: &Row) -> QueryResult<Option<bool>> {
        let value = self.evaluate(expr, row)?;
        self.datum_to_bool(&value)
    }

    /// Whether a WHERE clause would keep the row (NULL does not).
    pub fn matches(&self, expr: &Expression, row: &Row) -> QueryResult<bool> {
        Ok(self.evaluate_bool(expr, row)?.unwrap_or(false))
    }

    fn evaluate_constant(&self, constant: &Constant) -> QueryResult<Datum> {
        match constant.value() {
            ConstantValue::Null => Ok(Datum::Null),
            ConstantValue::Scalar(value) => scalar_datum(value, constant.declared_type()),
            ConstantValue::ArrayValue(values) => match constant.declared_type() {
                Some(SqlType::Jsonb) => Ok(Datum::Json(Value::Array(values.clone()))),
                _ => Ok(Datum::Array(values.clone())),
            },
            ConstantValue::ValueList(_) => Err(QueryError::Evaluation(
                "value list is only valid as the right side of IN".to_string(),
            )),
        }
    }

    fn evaluate_operation(&self, op: &Operation, row: &Row) -> QueryResult<Datum> {
        let operator = op.operator();
        let operands = op.operands();

        // Operators that must not evaluate every operand up front
        match operator.kind {
            OperatorKind::And => return self.evaluate_and(operands, row),
            OperatorKind::Or => return self.evaluate_or(operands, row),
            OperatorKind::In => return self.evaluate_in(operands, row),
            OperatorKind::CaseWhen => return self.evaluate_case(operands, row),
            OperatorKind::Coalesce => {
                for operand in operands {
                    let value = self.evaluate(operand, row)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                return Ok(Datum::Null);
            }
            _ => {}
        }

        let args = operands
            .iter()
            .map(|operand| self.evaluate(operand, row))
            .collect::<QueryResult<Vec<_>>>()?;

        match operator.kind {
            OperatorKind::IsNull => return Ok(Datum::Boolean(args[0].is_null())),
            OperatorKind::IsNotNull => return Ok(Datum::Boolean(!args[0].is_null())),
            OperatorKind::BuildObject => return build_object(&args),
            _ => {}
        }

        // Every remaining operator is strict: NULL in, NULL out
        if args.iter().any(Datum::is_null) {
            return Ok(Datum::Null);
        }

        match operator.kind {
            OperatorKind::Get => Ok(get(operator, &args[0], &args[1])?
                .map(Datum::Json)
                .unwrap_or(Datum::Null)),
            OperatorKind::GetText => Ok(match get(operator, &args[0], &args[1])? {
                None | Some(Value::Null) => Datum::Null,
                Some(Value::String(s)) => Datum::Text(s),
                Some(other) => Datum::Text(other.to_string()),
            }),
            OperatorKind::Contains => {
                let outer = json_arg(operator, &args[0])?;
                let inner = json_arg(operator, &args[1])?;
                Ok(Datum::Boolean(jsonb::contains(outer, inner)))
            }
            OperatorKind::ContainsKey => {
                let doc = json_arg(operator, &args[0])?;
                let key = text_arg(operator, &args[1])?;
                Ok(Datum::Boolean(jsonb::has_key(doc, key)))
            }
            OperatorKind::Concat => concat(operator, &args[0], &args[1]),
            OperatorKind::Size => match json_arg(operator, &args[0])? {
                Value::Array(items) => Ok(Datum::Integer(items.len() as i64)),
                _ => Err(QueryError::Evaluation(
                    "cannot get array length of a non-array".to_string(),
                )),
            },
            // Set-returning in SQL; the evaluator yields them as one array
            OperatorKind::Keys => match json_arg(operator, &args[0])? {
                Value::Object(map) => Ok(Datum::Array(
                    map.keys().map(|k| Value::String(k.clone())).collect(),
                )),
                _ => Err(QueryError::Evaluation(
                    "cannot call jsonb_object_keys on a non-object".to_string(),
                )),
            },
            OperatorKind::Elements => match json_arg(operator, &args[0])? {
                Value::Array(items) => Ok(Datum::Array(items.clone())),
                _ => Err(QueryError::Evaluation(
                    "cannot extract elements from a non-array".to_string(),
                )),
            },
            OperatorKind::TypeOf => Ok(Datum::Text(
                jsonb::type_name(json_arg(operator, &args[0])?).to_string(),
            )),
            OperatorKind::Set => {
                let doc = json_arg(operator, &args[0])?;
                let path = path_arg(operator, &args[1])?;
                let value = json_arg(operator, &args[2])?;
                Ok(Datum::Json(jsonb::set_path(doc, &path, value.clone())?))
            }
            OperatorKind::DeleteKey => {
                let doc = json_arg(operator, &args[0])?;
                Ok(Datum::Json(jsonb::delete_key(doc, text_arg(operator, &args[1])?)?))
            }
            OperatorKind::DeleteIndex => {
                let doc = json_arg(operator, &args[0])?;
                let index = integer_arg(operator, &args[1])?;
                Ok(Datum::Json(jsonb::delete_index(doc, index)?))
            }
            OperatorKind::DeletePath => {
                let doc = json_arg(operator, &args[0])?;
                let path = path_arg(operator, &args[1])?;
                Ok(Datum::Json(jsonb::delete_path(doc, &path)?))
            }
            OperatorKind::CastText => Ok(Datum::Text(args[0].to_string())),
            OperatorKind::CastInteger | OperatorKind::CastBigInt => {
                cast_integer(&args[0]).map(Datum::Integer)
            }
            OperatorKind::CastNumeric => cast_number(&args[0]).map(Datum::Number),
            OperatorKind::CastBoolean => cast_boolean(&args[0]).map(Datum::Boolean),
            OperatorKind::Eq => datums_equal(&args[0], &args[1]).map(Datum::Boolean),
            OperatorKind::Ne => datums_equal(&args[0], &args[1]).map(|eq| Datum::Boolean(!eq)),
            OperatorKind::Not => match self.datum_to_bool(&args[0])? {
                Some(b) => Ok(Datum::Boolean(!b)),
                None => Ok(Datum::Null),
            },
            // Handled before the operands are evaluated
            OperatorKind::And
            | OperatorKind::Or
            | OperatorKind::In
            | OperatorKind::CaseWhen
            | OperatorKind::Coalesce
            | OperatorKind::IsNull
            | OperatorKind::IsNotNull
            | OperatorKind::BuildObject => Err(QueryError::Evaluation(format!(
                "{} reached strict dispatch",
                operator.name
            ))),
        }
    }

    fn evaluate_case(&self, operands: &[Expression], row: &Row) -> QueryResult<Datum> {
        let [condition, then, otherwise] = operands else {
            return Err(QueryError::Evaluation(
                "CASE_WHEN needs three operands".to_string(),
            ));
        };
        match self.evaluate_bool(condition, row)? {
            Some(true) => self.evaluate(then, row),
            Some(false) | None => self.evaluate(otherwise, row),
        }
    }

    fn evaluate_and(&self, operands: &[Expression], row: &Row) -> QueryResult<Datum> {
        let mut saw_null = false;
        for operand in operands {
            match self.evaluate_bool(operand, row)? {
                Some(false) => return Ok(Datum::Boolean(false)),
                Some(true) => {}
                None => saw_null = true,
            }
        }
        Ok(if saw_null {
            Datum::Null
        } else {
            Datum::Boolean(true)
        })
    }

    fn evaluate_or(&self, operands: &[Expression], row: &Row) -> QueryResult<Datum> {
        let mut saw_null = false;
        for operand in operands {
            match self.evaluate_bool(operand, row)? {
                Some(true) => return Ok(Datum::Boolean(true)),
                Some(false) => {}
                None => saw_null = true,
            }
        }
        Ok(if saw_null {
            Datum::Null
        } else {
            Datum::Boolean(false)
        })
    }

    fn evaluate_in(&self, operands: &[Expression], row: &Row) -> QueryResult<Datum> {
        let (Some(subject), Some(list)) = (operands.first(), operands.get(1)) else {
            return Err(QueryError::Evaluation("IN needs two operands".to_string()));
        };
        let Some(constant) = list.as_constant() else {
            return Err(QueryError::Evaluation(
                "IN needs a value list".to_string(),
            ));
        };
        let ConstantValue::ValueList(values) = constant.value() else {
            return Err(QueryError::Evaluation(
                "IN needs a value list".to_string(),
            ));
        };

        let subject = self.evaluate(subject, row)?;
        if subject.is_null() {
            return Ok(Datum::Null);
        }

        let mut saw_null = false;
        for value in values {
            let candidate = scalar_datum(value, constant.declared_type())?;
            if candidate.is_null() {
                saw_null = true;
            } else if datums_equal(&subject, &candidate)? {
                return Ok(Datum::Boolean(true));
            }
        }
        Ok(if saw_null {
            Datum::Null
        } else {
            Datum::Boolean(false)
        })
    }

    fn datum_to_bool(&self, value: &Datum) -> QueryResult<Option<bool>> {
        match value {
            Datum::Boolean(b) => Ok(Some(*b)),
            Datum::Null => Ok(None),
            other => Err(QueryError::Evaluation(format!(
                "expected boolean, got {}",
                other.type_name()
            ))),
        }
    }
}

fn scalar_datum(value: &Value, declared: Option<&SqlType>) -> QueryResult<Datum> {
    let Some(sql_type) = declared else {
        return Ok(match value {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Datum::Integer(i),
                None => Datum::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Datum::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Datum::Json(value.clone()),
        });
    };

    // A typed jsonb null is the JSON literal; any other typed null is SQL NULL
    match (sql_type, value) {
        (SqlType::Jsonb, v) => Ok(Datum::Json(v.clone())),
        (_, Value::Null) => Ok(Datum::Null),
        (SqlType::Text, Value::String(s)) => Ok(Datum::Text(s.clone())),
        (SqlType::Text, v) => Ok(Datum::Text(v.to_string())),
        (SqlType::Integer | SqlType::BigInt, v) => {
            cast_integer(&Datum::Json(v.clone())).map(Datum::Integer)
        }
        (SqlType::Double | SqlType::Numeric, v) => {
            cast_number(&Datum::Json(v.clone())).map(Datum::Number)
        }
        (SqlType::Boolean, v) => cast_boolean(&Datum::Json(v.clone())).map(Datum::Boolean),
        (SqlType::Array(_), Value::Array(items)) => Ok(Datum::Array(items.clone())),
        (SqlType::Array(_), v) => Err(QueryError::Evaluation(format!(
            "{} is not an array",
            v
        ))),
    }
}

fn mismatch(operator: &Operator, expected: &str, actual: &Datum) -> QueryError {
    QueryError::Evaluation(format!(
        "{} expects {}, got {}",
        operator.name,
        expected,
        actual.type_name()
    ))
}

fn json_arg<'a>(operator: &Operator, value: &'a Datum) -> QueryResult<&'a Value> {
    match value {
        Datum::Json(v) => Ok(v),
        other => Err(mismatch(operator, "jsonb", other)),
    }
}

fn text_arg<'a>(operator: &Operator, value: &'a Datum) -> QueryResult<&'a str> {
    match value {
        Datum::Text(s) => Ok(s),
        other => Err(mismatch(operator, "text", other)),
    }
}

fn integer_arg(operator: &Operator, value: &Datum) -> QueryResult<i64> {
    match value {
        Datum::Integer(i) => Ok(*i),
        other => Err(mismatch(operator, "integer", other)),
    }
}

fn path_arg(operator: &Operator, value: &Datum) -> QueryResult<Vec<String>> {
    match value {
        Datum::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Ok(other.to_string()),
            })
            .collect(),
        other => Err(mismatch(operator, "text[]", other)),
    }
}

fn get(operator: &Operator, subject: &Datum, key: &Datum) -> QueryResult<Option<Value>> {
    let doc = json_arg(operator, subject)?;
    let found = match key {
        Datum::Text(k) => doc.as_object().and_then(|map| map.get(k)),
        Datum::Integer(i) => doc
            .as_array()
            .and_then(|items| items.get(jsonb::resolve_index(items.len(), *i)?)),
        Datum::Array(_) => jsonb::get_path(doc, &path_arg(operator, key)?),
        other => return Err(mismatch(operator, "text, integer or text[]", other)),
    };
    Ok(found.cloned())
}

fn concat(operator: &Operator, left: &Datum, right: &Datum) -> QueryResult<Datum> {
    match (left, right) {
        (Datum::Json(l), Datum::Json(r)) => Ok(Datum::Json(jsonb::concat(l, r))),
        (Datum::Array(l), Datum::Array(r)) => {
            Ok(Datum::Array(l.iter().chain(r).cloned().collect()))
        }
        (Datum::Json(_), other) => Err(mismatch(operator, "jsonb", other)),
        (other, _) => Err(mismatch(operator, "jsonb or array", other)),
    }
}

fn build_object(args: &[Datum]) -> QueryResult<Datum> {
    if args.len() % 2 != 0 {
        return Err(QueryError::Evaluation(
            "argument list must have even number of elements".to_string(),
        ));
    }

    let mut map = serde_json::Map::new();
    for pair in args.chunks(2) {
        let key = match &pair[0] {
            Datum::Null => {
                return Err(QueryError::Evaluation(
                    "object key must not be null".to_string(),
                ));
            }
            Datum::Text(s) => s.clone(),
            other => other.to_string(),
        };
        map.insert(key, pair[1].to_json());
    }
    Ok(Datum::Json(Value::Object(map)))
}

fn datums_equal(left: &Datum, right: &Datum) -> QueryResult<bool> {
    match (left, right) {
        (Datum::Json(a), Datum::Json(b)) => Ok(jsonb::json_eq(a, b)),
        (Datum::Text(a), Datum::Text(b)) => Ok(a == b),
        (Datum::Integer(a), Datum::Integer(b)) => Ok(a == b),
        (Datum::Integer(a), Datum::Number(b)) | (Datum::Number(b), Datum::Integer(a)) => {
            Ok((*a as f64) == *b)
        }
        (Datum::Number(a), Datum::Number(b)) => Ok(a == b),
        (Datum::Boolean(a), Datum::Boolean(b)) => Ok(a == b),
        (Datum::Array(a), Datum::Array(b)) => Ok(jsonb::json_eq(
            &Value::Array(a.clone()),
            &Value::Array(b.clone()),
        )),
        (a, b) => Err(QueryError::Evaluation(format!(
            "cannot compare {} with {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn cast_integer(value: &Datum) -> QueryResult<i64> {
    let invalid = || {
        QueryError::Evaluation(format!("invalid input for type integer: \"{}\"", value))
    };
    match value {
        Datum::Integer(i) => Ok(*i),
        Datum::Number(n) => Ok(n.round() as i64),
        Datum::Boolean(b) => Ok(i64::from(*b)),
        Datum::Text(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        Datum::Json(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .ok_or_else(invalid),
        Datum::Json(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn cast_number(value: &Datum) -> QueryResult<f64> {
    let invalid = || {
        QueryError::Evaluation(format!("invalid input for type numeric: \"{}\"", value))
    };
    match value {
        Datum::Integer(i) => Ok(*i as f64),
        Datum::Number(n) => Ok(*n),
        Datum::Text(s) => s.trim().parse::<f64>().map_err(|_| invalid()),
        Datum::Json(Value::Number(n)) => n.as_f64().ok_or_else(invalid),
        Datum::Json(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn cast_boolean(value: &Datum) -> QueryResult<bool> {
    let invalid = || {
        QueryError::Evaluation(format!("invalid input for type boolean: \"{}\"", value))
    };
    let parse = |s: &str| match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid()),
    };
    match value {
        Datum::Boolean(b) => Ok(*b),
        Datum::Integer(i) => Ok(*i != 0),
        Datum::Text(s) => parse(s),
        Datum::Json(Value::Bool(b)) => Ok(*b),
        Datum::Json(Value::String(s)) => parse(s),
        _ => Err(invalid()),
    }
}
