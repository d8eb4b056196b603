use crate::error::QueryError;
use crate::expr::path::{normalize, parse_dotted};

fn segments(inputs: &[&str]) -> Vec<String> {
    normalize(inputs).unwrap().into_iter().collect()
}

#[test]
fn test_discrete_segments_preserved() {
    assert_eq!(segments(&["tags"]), vec!["tags"]);
    assert_eq!(segments(&["tags", "primary"]), vec!["tags", "primary"]);
    assert_eq!(segments(&["b", "a", "0"]), vec!["b", "a", "0"]);
}

#[test]
fn test_dotted_input_split() {
    assert_eq!(segments(&["a.b.c"]), vec!["a", "b", "c"]);
    assert_eq!(parse_dotted("tags.primary").unwrap().len(), 2);
}

#[test]
fn test_dotted_mixed_with_segments() {
    assert!(matches!(
        normalize(&["a.b", "c"]),
        Err(QueryError::InvalidPath(_))
    ));
    assert!(matches!(
        normalize(&["c", "a.b"]),
        Err(QueryError::InvalidPath(_))
    ));
}

#[test]
fn test_empty_inputs() {
    let none: [&str; 0] = [];
    assert!(matches!(normalize(&none), Err(QueryError::InvalidPath(_))));
    assert!(matches!(normalize(&[""]), Err(QueryError::InvalidPath(_))));
    assert!(matches!(normalize(&["a", ""]), Err(QueryError::InvalidPath(_))));
}

#[test]
fn test_dotted_empty_piece() {
    assert!(matches!(normalize(&["a..b"]), Err(QueryError::InvalidPath(_))));
    assert!(matches!(normalize(&[".a"]), Err(QueryError::InvalidPath(_))));
    assert!(matches!(normalize(&["a."]), Err(QueryError::InvalidPath(_))));
}

#[test]
fn test_owned_strings_accepted() {
    let owned = vec!["x".to_string(), "y".to_string()];
    assert_eq!(normalize(&owned).unwrap().as_slice(), ["x", "y"]);
}
