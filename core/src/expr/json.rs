//! JSON navigation, containment and mutation built from the catalog.

use serde_json::Value;

use super::catalog::{
    BUILD_OBJECT, CAST_BIGINT, CAST_BOOLEAN, CAST_INTEGER, CAST_NUMERIC, CAST_TEXT, CONCAT,
    CONTAINS, CONTAINS_KEY, DELETE_INDEX, DELETE_KEY, DELETE_PATH, ELEMENTS, GET, GET_TEXT, KEYS,
    Operator, SET, SIZE, TYPEOF,
};
use super::path::normalize;
use super::{Constant, Expression};
use crate::error::{QueryError, QueryResult};
use crate::types::{SqlType, TypeTag};

impl Expression {
    /// Value at `path`, as jsonb. Accepts one dotted path or discrete segments.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> QueryResult<Expression> {
        let segments = normalize(path)?;
        Expression::operation(
            &GET,
            vec![self.clone(), Constant::text_array(segments).into()],
        )
    }

    /// Value at `path`, as text.
    pub fn get_text<S: AsRef<str>>(&self, path: &[S]) -> QueryResult<Expression> {
        let segments = normalize(path)?;
        Expression::operation(
            &GET_TEXT,
            vec![self.clone(), Constant::text_array(segments).into()],
        )
    }

    /// Value under a single object key. The key is not split on `.`.
    pub fn get_key(&self, key: &str) -> QueryResult<Expression> {
        Expression::operation(&GET, vec![self.clone(), Constant::text(key).into()])
    }

    pub fn get_key_text(&self, key: &str) -> QueryResult<Expression> {
        Expression::operation(&GET_TEXT, vec![self.clone(), Constant::text(key).into()])
    }

    /// Array element at `index`; negative indexes count from the end.
    pub fn get_index(&self, index: i64) -> QueryResult<Expression> {
        let index = array_index(&GET, "key", index)?;
        Expression::operation(&GET, vec![self.clone(), index.into()])
    }

    /// Value under a computed key or index.
    pub fn get_expr(&self, key: Expression) -> QueryResult<Expression> {
        Expression::operation(&GET, vec![self.clone(), key])
    }

    /// Text form of this value.
    ///
    /// A `GET` is rewritten to the matching `GET_TEXT` over the same operands
    /// so the extracted string is not quoted; anything else is cast.
    pub fn as_text(&self) -> QueryResult<Expression> {
        if let Some(op) = self.as_operation()
            && self.is_operation(&GET)
        {
            return Expression::operation(&GET_TEXT, op.operands().to_vec());
        }
        Expression::operation(&CAST_TEXT, vec![self.clone()])
    }

    pub fn as_integer(&self) -> QueryResult<Expression> {
        Expression::operation(&CAST_INTEGER, vec![self.text_for_cast()?])
    }

    pub fn as_long(&self) -> QueryResult<Expression> {
        Expression::operation(&CAST_BIGINT, vec![self.text_for_cast()?])
    }

    pub fn as_number(&self) -> QueryResult<Expression> {
        Expression::operation(&CAST_NUMERIC, vec![self.text_for_cast()?])
    }

    pub fn as_boolean(&self) -> QueryResult<Expression> {
        Expression::operation(&CAST_BOOLEAN, vec![self.text_for_cast()?])
    }

    // jsonb cannot be cast to a scalar type directly unless it already is
    // the right scalar, so extracted values go through their text form.
    fn text_for_cast(&self) -> QueryResult<Expression> {
        if self.is_operation(&GET) {
            self.as_text()
        } else {
            Ok(self.clone())
        }
    }

    /// Check if `key` is a top-level key (or string element) of this value.
    pub fn contains_key(&self, key: &str) -> QueryResult<Expression> {
        Expression::operation(&CONTAINS_KEY, vec![self.clone(), Constant::text(key).into()])
    }

    pub fn contains_key_expr(&self, key: Expression) -> QueryResult<Expression> {
        Expression::operation(&CONTAINS_KEY, vec![self.clone(), key])
    }

    /// Structural containment of another jsonb expression.
    pub fn contains(&self, other: Expression) -> QueryResult<Expression> {
        Expression::operation(&CONTAINS, vec![self.clone(), other])
    }

    /// Structural containment of a JSON literal, bound as one jsonb parameter.
    pub fn contains_value(&self, value: impl Into<Value>) -> QueryResult<Expression> {
        self.contains(Constant::jsonb(value).into())
    }

    pub fn concat(&self, other: Expression) -> QueryResult<Expression> {
        Expression::operation(&CONCAT, vec![self.clone(), other])
    }

    /// Append a collection of values.
    ///
    /// The collection is one value, never a list of alternatives: for a jsonb
    /// subject it becomes a jsonb array literal, for a SQL array subject an
    /// array parameter of the subject's type.
    pub fn concat_values<I, V>(&self, values: I) -> QueryResult<Expression>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let constant = match self.type_tag() {
            TypeTag::Json => Constant::jsonb(Value::Array(values)),
            _ => match self.declared_type() {
                Some(sql_type) if sql_type.is_array() => {
                    Constant::typed_array(values, sql_type.clone())
                }
                _ => Constant::array(values),
            },
        };
        self.concat(constant.into())
    }

    /// Length of a JSON array
    pub fn size(&self) -> QueryResult<Expression> {
        Expression::operation(&SIZE, vec![self.clone()])
    }

    pub fn keys(&self) -> QueryResult<Expression> {
        Expression::operation(&KEYS, vec![self.clone()])
    }

    pub fn elements(&self) -> QueryResult<Expression> {
        Expression::operation(&ELEMENTS, vec![self.clone()])
    }

    /// JSON type name: object, array, string, number, boolean or null
    pub fn type_of(&self) -> QueryResult<Expression> {
        Expression::operation(&TYPEOF, vec![self.clone()])
    }

    pub fn delete_by_key(&self, key: &str) -> QueryResult<Expression> {
        Expression::operation(&DELETE_KEY, vec![self.clone(), Constant::text(key).into()])
    }

    pub fn delete_by_index(&self, index: i64) -> QueryResult<Expression> {
        let index = array_index(&DELETE_INDEX, "index", index)?;
        Expression::operation(&DELETE_INDEX, vec![self.clone(), index.into()])
    }

    pub fn delete_by_path<S: AsRef<str>>(&self, path: &[S]) -> QueryResult<Expression> {
        let segments = normalize(path)?;
        Expression::operation(
            &DELETE_PATH,
            vec![self.clone(), Constant::text_array(segments).into()],
        )
    }

    /// Replace the value at `path` with `value`.
    pub fn set<S: AsRef<str>>(&self, path: &[S], value: Expression) -> QueryResult<Expression> {
        let segments = normalize(path)?;
        Expression::operation(
            &SET,
            vec![self.clone(), Constant::text_array(segments).into(), value],
        )
    }

    /// Replace the value at `path` with a JSON literal.
    pub fn set_value<S: AsRef<str>>(
        &self,
        path: &[S],
        value: impl Into<Value>,
    ) -> QueryResult<Expression> {
        self.set(path, Constant::jsonb(value).into())
    }
}

// jsonb `->` and `-` only take an int4 index
fn array_index(operator: &Operator, param: &'static str, index: i64) -> QueryResult<Constant> {
    let index = i32::try_from(index).map_err(|_| QueryError::TypeMismatch {
        operator: operator.name,
        param,
        expected: "integer between -2147483648 and 2147483647".to_string(),
        actual: index.to_string(),
    })?;
    Ok(Constant::int(index))
}

/// Build a JSON object from key/value pairs.
pub fn build_object<I, K>(pairs: I) -> QueryResult<Expression>
where
    I: IntoIterator<Item = (K, Expression)>,
    K: Into<String>,
{
    let mut operands = Vec::new();
    for (key, value) in pairs {
        operands.push(Constant::typed(Value::String(key.into()), SqlType::Text).into());
        operands.push(value);
    }
    Expression::operation(&BUILD_OBJECT, operands)
}
