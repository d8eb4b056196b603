//! jsonb_sql - typed jsonb expressions compiled to parameterized PostgreSQL
//!
//! Build an [`Expression`] over jsonb columns, serialize it with a
//! [`Serializer`], or collect assignments and JSON patches into an
//! [`UpdateSet`] and compile the whole `UPDATE` at once. Compiled parameters
//! are bound to typed positions by the [`ParameterBinder`].

pub mod config;
pub mod error;
pub mod eval;
pub mod expr;
pub mod sql;
pub mod types;

pub use config::{ColumnKind, CompilerConfig, PlaceholderStyle, TypeMappings};
pub use error::{QueryError, QueryResult};
pub use eval::{Datum, Evaluator, Row};
pub use expr::{
    Column, ColumnSource, Constant, ConstantValue, Expression, Ident, PathRef, build_object,
    normalize,
};
pub use sql::{
    BoundStatement, BoundValue, CompiledSql, Dialect, JsonPatch, ParamBinding, ParameterBinder,
    RecordingSink, Serializer, StatementSink, Template, UpdateSet, UpdateSetBuilder, compile,
};
pub use types::{SqlType, TypeTag};
