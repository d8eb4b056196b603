use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while building, compiling or binding a statement.
///
/// Every variant is terminal for the statement being built: nothing is
/// retried and no partial statement is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
	#[error("Invalid path: {0}")]
	InvalidPath(String),

	#[error("Operator '{operator}' expects {expected} operand(s), got {actual}")]
	OperatorArityMismatch {
		operator: &'static str,
		expected: String,
		actual: usize,
	},

	#[error("Operator '{operator}' expects {expected} for operand '{param}', got {actual}")]
	TypeMismatch {
		operator: &'static str,
		param: &'static str,
		expected: String,
		actual: String,
	},

	#[error("Update of '{0}' has no assignments or patches")]
	EmptyUpdate(String),

	#[error("Cannot resolve SQL type for parameter {position}: {shape}")]
	UnresolvedParameterType { position: usize, shape: String },

	#[error("Operator '{0}' requires a non-empty value list")]
	EmptyValueList(&'static str),

	#[error("Unknown operator: {0}")]
	UnknownOperator(String),

	#[error("Invalid template: {0}")]
	Template(String),

	#[error("Evaluation error: {0}")]
	Evaluation(String),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl QueryError {
	/// Short, stable name of the error kind
	pub fn kind(&self) -> &'static str {
		match self {
			QueryError::InvalidPath(_) => "invalid_path",
			QueryError::OperatorArityMismatch { .. } => "operator_arity_mismatch",
			QueryError::TypeMismatch { .. } => "type_mismatch",
			QueryError::EmptyUpdate(_) => "empty_update",
			QueryError::UnresolvedParameterType { .. } => "unresolved_parameter_type",
			QueryError::EmptyValueList(_) => "empty_value_list",
			QueryError::UnknownOperator(_) => "unknown_operator",
			QueryError::Template(_) => "template_error",
			QueryError::Evaluation(_) => "evaluation_error",
			QueryError::Config(_) => "config_error",
		}
	}
}
