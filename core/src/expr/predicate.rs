//! Comparison, logic and null predicates.

use serde_json::Value;

use super::catalog::{AND, CASE_WHEN, COALESCE, EQ, IN, IS_NOT_NULL, IS_NULL, NE, NOT, OR};
use super::{Constant, Expression};
use crate::error::QueryResult;
use crate::types::{SqlType, TypeTag};

impl Expression {
    pub fn equals(&self, other: impl Into<Expression>) -> QueryResult<Expression> {
        Expression::operation(&EQ, vec![self.clone(), other.into()])
    }

    pub fn not_equals(&self, other: impl Into<Expression>) -> QueryResult<Expression> {
        Expression::operation(&NE, vec![self.clone(), other.into()])
    }

    pub fn and(&self, other: Expression) -> QueryResult<Expression> {
        Expression::operation(&AND, vec![self.clone(), other])
    }

    pub fn or(&self, other: Expression) -> QueryResult<Expression> {
        Expression::operation(&OR, vec![self.clone(), other])
    }

    pub fn not(&self) -> QueryResult<Expression> {
        Expression::operation(&NOT, vec![self.clone()])
    }

    pub fn all_of(conditions: impl IntoIterator<Item = Expression>) -> QueryResult<Expression> {
        Expression::operation(&AND, conditions.into_iter().collect())
    }

    pub fn any_of(conditions: impl IntoIterator<Item = Expression>) -> QueryResult<Expression> {
        Expression::operation(&OR, conditions.into_iter().collect())
    }

    /// `IS NULL` without JSON widening
    pub fn is_sql_null(&self) -> QueryResult<Expression> {
        Expression::operation(&IS_NULL, vec![self.clone()])
    }

    /// `IS NOT NULL` without JSON widening
    pub fn is_sql_not_null(&self) -> QueryResult<Expression> {
        Expression::operation(&IS_NOT_NULL, vec![self.clone()])
    }

    /// Null check.
    ///
    /// A jsonb value can hold the literal `null` as well as be SQL NULL, so
    /// for jsonb subjects both count: `x IS NULL OR x = 'null'::jsonb`.
    pub fn is_null(&self) -> QueryResult<Expression> {
        if self.type_tag() != TypeTag::Json {
            return self.is_sql_null();
        }
        Expression::any_of([
            self.is_sql_null()?,
            self.equals(Constant::json_null())?,
        ])
    }

    /// Negation of [`is_null`](Self::is_null): `x IS NOT NULL AND x <> 'null'::jsonb`.
    pub fn is_not_null(&self) -> QueryResult<Expression> {
        if self.type_tag() != TypeTag::Json {
            return self.is_sql_not_null();
        }
        Expression::all_of([
            self.is_sql_not_null()?,
            self.not_equals(Constant::json_null())?,
        ])
    }

    pub fn is_array(&self) -> QueryResult<Expression> {
        Expression::all_of([
            self.is_not_null()?,
            self.type_of()?.equals(Constant::text("array"))?,
        ])
    }

    /// Null, missing and zero-length arrays are empty. A non-array value is not.
    ///
    /// The length is only taken once the value is known to be an array:
    /// `jsonb_array_length` raises on objects and scalars, and `AND` does not
    /// fix the order its operands run in.
    pub fn is_empty_array(&self) -> QueryResult<Expression> {
        let zero_length = Expression::case_when(
            self.is_array()?,
            self.size()?.equals(Constant::integer(0))?,
            Constant::scalar(false).into(),
        )?;
        Expression::any_of([self.is_null()?, zero_length])
    }

    /// `then` where `condition` holds, `otherwise` where it is false or NULL.
    pub fn case_when(
        condition: Expression,
        then: Expression,
        otherwise: Expression,
    ) -> QueryResult<Expression> {
        Expression::operation(&CASE_WHEN, vec![condition, then, otherwise])
    }

    /// Membership in a list of alternatives, one parameter per element.
    ///
    /// Elements take the subject's declared scalar type when it has one.
    pub fn is_in<I, V>(&self, values: I) -> QueryResult<Expression>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut list = Constant::value_list(values);
        if let Some(sql_type) = self.declared_type()
            && !sql_type.is_array()
            && *sql_type != SqlType::Jsonb
        {
            list = list.with_type(sql_type.clone());
        }
        Expression::operation(&IN, vec![self.clone(), list.into()])
    }

    /// First non-null of this value and `fallbacks`
    pub fn coalesce(
        &self,
        fallbacks: impl IntoIterator<Item = Expression>,
    ) -> QueryResult<Expression> {
        let mut operands = vec![self.clone()];
        operands.extend(fallbacks);
        Expression::operation(&COALESCE, operands)
    }
}
