//! Path normalization.
//!
//! A JSON path may be given as one dotted string (`"tags.primary"`) or as
//! discrete segments (`["tags", "primary"]`), never as a mix of both.

use smallvec::SmallVec;

use crate::error::{QueryError, QueryResult};

/// Canonical, non-empty, ordered path segments.
pub type PathSegments = SmallVec<[String; 4]>;

/// Normalize raw path inputs into canonical segments.
///
/// A dotted input must be the only input and is split on `.`. Otherwise each
/// input becomes one segment, in the order given. Empty input sets and empty
/// segments are rejected.
pub fn normalize<S: AsRef<str>>(inputs: &[S]) -> QueryResult<PathSegments> {
    if inputs.is_empty() {
        return Err(QueryError::InvalidPath(
            "path must have at least one segment".to_string(),
        ));
    }

    if let Some(dotted) = inputs.iter().find(|s| s.as_ref().contains('.')) {
        if inputs.len() != 1 {
            return Err(QueryError::InvalidPath(format!(
                "dotted path '{}' cannot be combined with other segments",
                dotted.as_ref()
            )));
        }

        let raw = dotted.as_ref();
        let segments: PathSegments = raw.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(QueryError::InvalidPath(format!(
                "dotted path '{}' contains an empty segment",
                raw
            )));
        }
        return Ok(segments);
    }

    let mut segments = PathSegments::with_capacity(inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        let segment = input.as_ref();
        if segment.is_empty() {
            return Err(QueryError::InvalidPath(format!("segment {} is empty", i)));
        }
        segments.push(segment.to_owned());
    }

    Ok(segments)
}

/// Normalize a single dotted path string.
pub fn parse_dotted(path: &str) -> QueryResult<PathSegments> {
    normalize(&[path])
}
