//! SQL generation: dialect templates, the expression serializer, the UPDATE
//! compiler and parameter binding.

pub mod binder;
pub mod dialect;
pub mod serializer;
pub mod update;

#[cfg(test)]
mod tests;

pub use binder::{
    BoundStatement, BoundValue, ParamBinding, ParameterBinder, RecordingSink, StatementSink,
};
pub use dialect::{Dialect, Template, default_dialect};
pub use serializer::{CompiledSql, Serializer, quote_ident};
pub use update::{JsonPatch, UpdateSet, UpdateSetBuilder, compile};
