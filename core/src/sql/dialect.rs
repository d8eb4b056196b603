//! Operator rendering templates.
//!
//! A template is SQL text with operand slots: `{1}`, `{2}`, ... name an
//! operand by 1-based position, `{*}` expands to every operand joined by the
//! template's separator, and `{{` / `}}` are literal braces.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::expr::catalog::{self, Operator};
use crate::expr::lookup_operator;

/// Parsed piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePiece {
    Text(String),
    /// 0-based operand index
    Operand(usize),
    AllOperands,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pattern: Cow<'static, str>,
    separator: Cow<'static, str>,
    /// Used instead of `pattern` when the key operand is a `text[]` path
    path_pattern: Option<Cow<'static, str>>,
}

impl Template {
    pub fn new(pattern: impl Into<Cow<'static, str>>) -> Self {
        Self {
            pattern: pattern.into(),
            separator: Cow::Borrowed(", "),
            path_pattern: None,
        }
    }

    pub fn with_separator(mut self, separator: impl Into<Cow<'static, str>>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_path_form(mut self, pattern: impl Into<Cow<'static, str>>) -> Self {
        self.path_pattern = Some(pattern.into());
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn has_path_form(&self) -> bool {
        self.path_pattern.is_some()
    }

    /// Pieces of the pattern to render, picking the path form when asked and available.
    pub fn pieces(&self, path_form: bool) -> QueryResult<Vec<TemplatePiece>> {
        match (&self.path_pattern, path_form) {
            (Some(path_pattern), true) => parse_pattern(path_pattern),
            _ => parse_pattern(&self.pattern),
        }
    }

    /// Check both patterns parse and only reference operands `operator` can have.
    fn validate(&self, operator: &Operator) -> QueryResult<()> {
        let patterns = std::iter::once(&self.pattern).chain(self.path_pattern.as_ref());
        for pattern in patterns {
            for piece in parse_pattern(pattern)? {
                if let TemplatePiece::Operand(index) = piece
                    && operator.max_args.is_some_and(|max| index >= max)
                {
                    return Err(QueryError::Template(format!(
                        "'{}' references operand {} but {} takes at most {}",
                        pattern,
                        index + 1,
                        operator.name,
                        operator.max_args.unwrap_or_default()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_pattern(pattern: &str) -> QueryResult<Vec<TemplatePiece>> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut slot = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => slot.push(ch),
                        None => {
                            return Err(QueryError::Template(format!(
                                "unclosed slot in '{}'",
                                pattern
                            )));
                        }
                    }
                }

                if !text.is_empty() {
                    pieces.push(TemplatePiece::Text(std::mem::take(&mut text)));
                }
                if slot == "*" {
                    pieces.push(TemplatePiece::AllOperands);
                    continue;
                }
                match slot.parse::<usize>() {
                    Ok(n) if n >= 1 => pieces.push(TemplatePiece::Operand(n - 1)),
                    _ => {
                        return Err(QueryError::Template(format!(
                            "invalid slot '{{{}}}' in '{}'",
                            slot, pattern
                        )));
                    }
                }
            }
            '}' => {
                return Err(QueryError::Template(format!(
                    "unmatched '}}' in '{}'",
                    pattern
                )));
            }
            _ => text.push(c),
        }
    }

    if !text.is_empty() {
        pieces.push(TemplatePiece::Text(text));
    }
    Ok(pieces)
}

/// Operator name to template table for one SQL dialect.
///
/// Built once and read-only afterwards; overrides produce a new table.
#[derive(Debug, Clone)]
pub struct Dialect {
    name: Cow<'static, str>,
    templates: HashMap<&'static str, Template>,
}

impl Dialect {
    /// PostgreSQL jsonb operators and functions.
    pub fn postgres() -> Self {
        let entries: [(&Operator, Template); 29] = [
            (
                &catalog::GET,
                Template::new("({1} -> {2})").with_path_form("({1} #> {2})"),
            ),
            (
                &catalog::GET_TEXT,
                Template::new("({1} ->> {2})").with_path_form("({1} #>> {2})"),
            ),
            (&catalog::CONTAINS, Template::new("({1} @> {2})")),
            (&catalog::CONTAINS_KEY, Template::new("({1} ? {2})")),
            (&catalog::CONCAT, Template::new("({1} || {2})")),
            (&catalog::SIZE, Template::new("jsonb_array_length({1})")),
            (&catalog::KEYS, Template::new("jsonb_object_keys({1})")),
            (&catalog::ELEMENTS, Template::new("jsonb_array_elements({1})")),
            (&catalog::TYPEOF, Template::new("jsonb_typeof({1})")),
            (&catalog::BUILD_OBJECT, Template::new("jsonb_build_object({*})")),
            (&catalog::SET, Template::new("jsonb_set({1}, {2}, {3})")),
            (&catalog::DELETE_KEY, Template::new("({1} - {2})")),
            (&catalog::DELETE_INDEX, Template::new("({1} - {2})")),
            (&catalog::DELETE_PATH, Template::new("({1} #- {2})")),
            (&catalog::CAST_TEXT, Template::new("({1})::text")),
            (&catalog::CAST_INTEGER, Template::new("({1})::integer")),
            (&catalog::CAST_BIGINT, Template::new("({1})::bigint")),
            (&catalog::CAST_NUMERIC, Template::new("({1})::numeric")),
            (&catalog::CAST_BOOLEAN, Template::new("({1})::boolean")),
            (&catalog::EQ, Template::new("({1} = {2})")),
            (&catalog::NE, Template::new("({1} <> {2})")),
            (&catalog::AND, Template::new("({*})").with_separator(" AND ")),
            (&catalog::OR, Template::new("({*})").with_separator(" OR ")),
            (&catalog::NOT, Template::new("(NOT {1})")),
            (&catalog::IS_NULL, Template::new("({1} IS NULL)")),
            (&catalog::IS_NOT_NULL, Template::new("({1} IS NOT NULL)")),
            (&catalog::IN, Template::new("({1} IN {2})")),
            (&catalog::COALESCE, Template::new("coalesce({*})")),
            (
                &catalog::CASE_WHEN,
                Template::new("(CASE WHEN {1} THEN {2} ELSE {3} END)"),
            ),
        ];

        Self {
            name: Cow::Borrowed("postgres"),
            templates: entries
                .into_iter()
                .map(|(op, template)| (op.name, template))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renamed(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the template for one operator.
    pub fn with_template(mut self, operator_name: &str, template: Template) -> QueryResult<Self> {
        let operator = lookup_operator(operator_name)
            .ok_or_else(|| QueryError::UnknownOperator(operator_name.to_string()))?;
        template.validate(operator)?;

        debug!(
            dialect = %self.name,
            operator = operator.name,
            pattern = template.pattern(),
            "template override applied"
        );
        self.templates.insert(operator.name, template);
        Ok(self)
    }

    pub fn template(&self, operator: &Operator) -> QueryResult<&Template> {
        self.templates
            .get(operator.name)
            .ok_or_else(|| QueryError::UnknownOperator(operator.name.to_string()))
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::postgres()
    }
}

/// Shared PostgreSQL dialect
pub fn default_dialect() -> &'static Dialect {
    static DIALECT: OnceLock<Dialect> = OnceLock::new();
    DIALECT.get_or_init(Dialect::postgres)
}
