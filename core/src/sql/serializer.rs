//! Expression to SQL text.
//!
//! Rendering happens in two passes. The tree walk produces a [`Fragment`], a
//! run of SQL text and parameter pieces; operands are rendered left to right
//! and then spliced into the operator's template. Placeholders are numbered
//! only when the final fragment is finished, so the parameter list is always
//! in the order the placeholders appear in the text.

use tracing::{debug, trace};

use crate::config::PlaceholderStyle;
use crate::error::{QueryError, QueryResult};
use crate::expr::{Constant, ConstantValue, Expression, Ident, PathRef};
use crate::sql::dialect::{Dialect, TemplatePiece, default_dialect};
use crate::sql::update::UpdateSet;
use crate::types::TypeTag;

/// SQL text with its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<Constant>,
}

impl CompiledSql {
    /// Number of placeholders in `sql`, counting each value list element
    pub fn placeholder_count(&self) -> usize {
        self.params.iter().map(Constant::placeholder_count).sum()
    }
}

#[derive(Debug, Clone)]
enum Piece {
    Sql(String),
    Param(Constant),
}

#[derive(Debug, Clone, Default)]
struct Fragment {
    pieces: Vec<Piece>,
}

impl Fragment {
    fn sql(&mut self, s: impl AsRef<str>) {
        if let Some(Piece::Sql(last)) = self.pieces.last_mut() {
            last.push_str(s.as_ref());
        } else {
            self.pieces.push(Piece::Sql(s.as_ref().to_owned()));
        }
    }

    fn param(&mut self, constant: Constant) {
        self.pieces.push(Piece::Param(constant));
    }

    fn append(&mut self, other: &Fragment) {
        for piece in &other.pieces {
            match piece {
                Piece::Sql(s) => self.sql(s),
                Piece::Param(c) => self.param(c.clone()),
            }
        }
    }

    fn finish(self, placeholder: PlaceholderStyle) -> CompiledSql {
        let mut counter = 1;
        let mut sql = String::new();
        let mut params = Vec::new();

        for piece in self.pieces {
            match piece {
                Piece::Sql(s) => sql += &s,
                Piece::Param(constant) => {
                    if let ConstantValue::ValueList(values) = constant.value() {
                        let slots: Vec<String> = (0..values.len())
                            .map(|i| placeholder.render(counter + i))
                            .collect();
                        sql += &format!("({})", slots.join(", "));
                    } else {
                        sql += &placeholder.render(counter);
                    }
                    counter += constant.placeholder_count();
                    params.push(constant);
                }
            }
        }

        CompiledSql { sql, params }
    }
}

/// Renders expressions and UPDATE statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    dialect: &'a Dialect,
    placeholder: PlaceholderStyle,
}

impl Serializer<'static> {
    /// PostgreSQL templates with `?` placeholders
    pub fn postgres() -> Self {
        Self::new(default_dialect(), PlaceholderStyle::Anonymous)
    }
}

impl<'a> Serializer<'a> {
    pub fn new(dialect: &'a Dialect, placeholder: PlaceholderStyle) -> Self {
        Self {
            dialect,
            placeholder,
        }
    }

    pub fn dialect(&self) -> &Dialect {
        self.dialect
    }

    pub fn serialize(&self, expr: &Expression) -> QueryResult<CompiledSql> {
        let fragment = self.fragment(expr)?;
        let compiled = fragment.finish(self.placeholder);
        trace!(sql = %compiled.sql, params = compiled.params.len(), "serialized expression");
        Ok(compiled)
    }

    /// Render `UPDATE <table> SET ... [WHERE ...]`.
    ///
    /// Patches are merged into the assignments first; see [`UpdateSet::lower`].
    pub fn serialize_assignments(
        &self,
        update: &UpdateSet,
        filter: Option<&Expression>,
    ) -> QueryResult<CompiledSql> {
        let assignments = update.lower()?;

        let mut out = Fragment::default();
        out.sql("UPDATE ");
        out.sql(render_qualified(update.table().as_str()));
        out.sql(" SET ");

        for (i, (column, value)) in assignments.iter().enumerate() {
            if i > 0 {
                out.sql(", ");
            }
            out.sql(render_column(column));
            out.sql(" = ");
            out.append(&self.fragment(value)?);
        }

        if let Some(filter) = filter {
            let tag = filter.type_tag();
            if !tag.can_coerce_to(TypeTag::Boolean) {
                return Err(QueryError::TypeMismatch {
                    operator: "WHERE",
                    param: "condition",
                    expected: TypeTag::Boolean.display_name().to_string(),
                    actual: tag.display_name().to_string(),
                });
            }
            out.sql(" WHERE ");
            out.append(&self.fragment(filter)?);
        }

        let compiled = out.finish(self.placeholder);
        debug!(
            table = %update.table(),
            assignments = update.assignment_count(),
            patches = update.patch_count(),
            params = compiled.params.len(),
            "compiled update"
        );
        Ok(compiled)
    }

    fn fragment(&self, expr: &Expression) -> QueryResult<Fragment> {
        let mut out = Fragment::default();
        match expr {
            Expression::Path(path) => out.sql(render_path(path)),
            Expression::Constant(constant) => out.param(constant.clone()),
            Expression::Operation(op) => {
                let template = self.dialect.template(op.operator())?;
                let operands = op
                    .operands()
                    .iter()
                    .map(|operand| self.fragment(operand))
                    .collect::<QueryResult<Vec<_>>>()?;

                let path_form = op
                    .operands()
                    .get(1)
                    .is_some_and(|key| key.type_tag() == TypeTag::TextArray);

                for piece in template.pieces(path_form)? {
                    match piece {
                        TemplatePiece::Text(s) => out.sql(s),
                        TemplatePiece::Operand(index) => {
                            let operand = operands.get(index).ok_or_else(|| {
                                QueryError::Template(format!(
                                    "'{}' references operand {} but {} has {}",
                                    template.pattern(),
                                    index + 1,
                                    op.operator().name,
                                    operands.len()
                                ))
                            })?;
                            out.append(operand);
                        }
                        TemplatePiece::AllOperands => {
                            for (i, operand) in operands.iter().enumerate() {
                                if i > 0 {
                                    out.sql(template.separator());
                                }
                                out.append(operand);
                            }
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Quote an identifier unless it is a plain lower-case name.
pub fn quote_ident(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');

    if plain {
        name.to_string()
    } else {
        // Escape any existing quotes by doubling them
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn render_qualified(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

fn render_path(path: &PathRef) -> String {
    path.owner()
        .into_iter()
        .chain(path.segments())
        .map(|ident| quote_ident(ident.as_str()))
        .collect::<Vec<_>>()
        .join(".")
}

// SET targets are never qualified
fn render_column(path: &PathRef) -> String {
    path.segments()
        .iter()
        .map(Ident::as_str)
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}
