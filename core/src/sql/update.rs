//! UPDATE statements mixing plain assignments with jsonb patches.

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::expr::catalog::SET;
use crate::expr::{
    ColumnSource, Constant, Expression, Ident, PathRef, PathSegments, normalize, parse_dotted,
};
use crate::sql::serializer::{CompiledSql, Serializer};
use crate::types::{SqlType, TypeTag};

/// Replace the value at `path` inside `target`'s current JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPatch {
    target: PathRef,
    path: PathSegments,
    value: Expression,
}

impl JsonPatch {
    pub fn new(target: PathRef, path: PathSegments, value: Expression) -> QueryResult<Self> {
        if path.is_empty() || path.iter().any(String::is_empty) {
            return Err(QueryError::InvalidPath(format!(
                "patch of '{}' needs a non-empty path",
                target.full_path()
            )));
        }

        let tag = target.sql_type().tag();
        if tag != TypeTag::Json {
            return Err(QueryError::TypeMismatch {
                operator: SET.name,
                param: "subject",
                expected: TypeTag::Json.display_name().to_string(),
                actual: tag.display_name().to_string(),
            });
        }
        SET.check_operand(2, value.type_tag())?;

        Ok(Self {
            target,
            path,
            value,
        })
    }

    pub fn target(&self) -> &PathRef {
        &self.target
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn value(&self) -> &Expression {
        &self.value
    }

    /// `jsonb_set(current, path, value)`
    pub fn lower(&self, current: Expression) -> QueryResult<Expression> {
        Expression::operation(
            &SET,
            vec![
                current,
                Constant::text_array(self.path.iter().cloned()).into(),
                self.value.clone(),
            ],
        )
    }
}

/// Column identity inside one table: the unqualified name segments.
///
/// The owner is checked against the table and the declared type belongs to
/// the value, so neither takes part in the key.
type ColumnKey = SmallVec<[Ident; 2]>;

type PatchKey = (ColumnKey, PathSegments);

fn column_key(path: &PathRef) -> ColumnKey {
    path.segments().iter().cloned().collect()
}

/// Whether `owner` names `table`, either in full or by its last segment.
fn names_table(table: &Ident, owner: &Ident) -> bool {
    owner == table || table.as_str().rsplit('.').next() == Some(owner.as_str())
}

/// Assignments and patches for one table, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSet {
    table: Ident,
    assignments: IndexMap<ColumnKey, (PathRef, Expression)>,
    patches: IndexMap<PatchKey, JsonPatch>,
}

impl UpdateSet {
    pub fn builder(table: impl Into<Ident>) -> UpdateSetBuilder {
        UpdateSetBuilder {
            table: table.into(),
            assignments: IndexMap::new(),
            patches: IndexMap::new(),
            error: None,
        }
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.patches.is_empty()
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    pub fn assignments(&self) -> impl Iterator<Item = (&PathRef, &Expression)> {
        self.assignments.values().map(|(target, value)| (target, value))
    }

    pub fn patches(&self) -> impl Iterator<Item = &JsonPatch> {
        self.patches.values()
    }

    /// Merge patches into the assignments, one final value per column.
    ///
    /// Each patch wraps the column's current value: the directly assigned
    /// expression if there is one, otherwise the column itself. A patched
    /// column that was also assigned keeps the assignment's position; columns
    /// only patched follow the plain assignments in patch order. Several
    /// patches on one column nest in registration order.
    pub fn lower(&self) -> QueryResult<Vec<(PathRef, Expression)>> {
        if self.is_empty() {
            return Err(QueryError::EmptyUpdate(self.table.to_string()));
        }

        let mut merged = self.assignments.clone();
        for ((column, _), patch) in &self.patches {
            match merged.get_mut(column) {
                Some((_, current)) => {
                    *current = patch.lower(current.clone())?;
                }
                None => {
                    let current = Expression::Path(patch.target().clone());
                    let patched = patch.lower(current)?;
                    merged.insert(column.clone(), (patch.target().clone(), patched));
                }
            }
        }

        Ok(merged.into_values().collect())
    }
}

/// Accumulates an [`UpdateSet`].
///
/// A column qualified with a table other than the one being updated is
/// recorded as an error and reported by [`build`](Self::build); later calls
/// are ignored once an error is recorded.
#[derive(Debug, Clone)]
pub struct UpdateSetBuilder {
    table: Ident,
    assignments: IndexMap<ColumnKey, (PathRef, Expression)>,
    patches: IndexMap<PatchKey, JsonPatch>,
    error: Option<QueryError>,
}

impl UpdateSetBuilder {
    /// Assign an expression. A later assignment to the same column replaces
    /// the value but keeps the original position.
    pub fn set(mut self, column: &impl ColumnSource, value: Expression) -> Self {
        let target = PathRef::from_column(column);
        if self.accepts(&target) {
            self.assignments.insert(column_key(&target), (target, value));
        }
        self
    }

    /// Assign a literal bound with the column's declared type.
    pub fn set_value(self, column: &impl ColumnSource, value: impl Into<Value>) -> Self {
        let value = value.into();
        let sql_type = column.sql_type();
        let constant = match value {
            Value::Null => return self.set_null(column),
            Value::Array(items) if sql_type.is_array() => Constant::typed_array(items, sql_type),
            other => Constant::typed(other, sql_type),
        };
        self.set(column, constant.into())
    }

    /// Assign SQL NULL
    pub fn set_null(self, column: &impl ColumnSource) -> Self {
        let sql_type = column.sql_type();
        self.set(column, Constant::sql_null(sql_type).into())
    }

    /// Assign a literal bound with an explicit SQL type.
    pub fn set_typed(
        self,
        column: &impl ColumnSource,
        value: impl Into<Value>,
        sql_type: SqlType,
    ) -> Self {
        self.set(column, Constant::typed(value, sql_type).into())
    }

    /// Patch a JSON literal in at a dotted path such as `"tags.primary"`.
    ///
    /// Strings are stored as JSON strings and `null` as the JSON literal.
    pub fn set_json(
        self,
        column: &impl ColumnSource,
        path: &str,
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        let segments = parse_dotted(path)?;
        let patch = JsonPatch::new(
            PathRef::from_column(column),
            segments,
            Constant::jsonb(value).into(),
        )?;
        Ok(self.patch(patch))
    }

    /// Patch a JSON literal in at a path given as segments.
    pub fn set_json_at<S: AsRef<str>>(
        self,
        column: &impl ColumnSource,
        path: &[S],
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        self.set_json_expr(column, path, Constant::jsonb(value).into())
    }

    /// Patch a computed jsonb value in at `path`.
    pub fn set_json_expr<S: AsRef<str>>(
        self,
        column: &impl ColumnSource,
        path: &[S],
        value: Expression,
    ) -> QueryResult<Self> {
        let segments = normalize(path)?;
        let patch = JsonPatch::new(PathRef::from_column(column), segments, value)?;
        Ok(self.patch(patch))
    }

    /// Register a patch. The first patch for a (column, path) pair wins.
    pub fn patch(mut self, patch: JsonPatch) -> Self {
        if !self.accepts(&patch.target) {
            return self;
        }

        let key = (column_key(&patch.target), patch.path.clone());
        match self.patches.entry(key) {
            Entry::Occupied(_) => {
                debug!(
                    table = %self.table,
                    column = %patch.target.column_path(),
                    path = %patch.path.join("."),
                    "duplicate patch ignored"
                );
            }
            Entry::Vacant(entry) => {
                entry.insert(patch);
            }
        }
        self
    }

    pub fn build(self) -> QueryResult<UpdateSet> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(UpdateSet {
            table: self.table,
            assignments: self.assignments,
            patches: self.patches,
        })
    }

    fn accepts(&mut self, target: &PathRef) -> bool {
        if self.error.is_some() {
            return false;
        }
        if let Some(owner) = target.owner()
            && !names_table(&self.table, owner)
        {
            self.error = Some(QueryError::InvalidPath(format!(
                "column '{}' belongs to '{}', not to updated table '{}'",
                target.column_path(),
                owner,
                self.table
            )));
            return false;
        }
        true
    }
}

/// Compile an update with the PostgreSQL dialect and `?` placeholders.
pub fn compile(update: &UpdateSet, filter: Option<&Expression>) -> QueryResult<CompiledSql> {
    Serializer::postgres().serialize_assignments(update, filter)
}
