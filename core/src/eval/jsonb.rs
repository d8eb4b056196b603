//! jsonb document operations.

use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};

/// Equality with numbers compared by value, so `1` equals `1.0`.
pub(crate) fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

/// `@>` containment.
pub(crate) fn contains(outer: &Value, inner: &Value) -> bool {
    match (outer, inner) {
        (Value::Object(o), Value::Object(i)) => i
            .iter()
            .all(|(k, iv)| o.get(k).is_some_and(|ov| contains(ov, iv))),
        (Value::Array(o), Value::Array(i)) => {
            i.iter().all(|iv| o.iter().any(|ov| contains(ov, iv)))
        }
        // An array contains a primitive it holds at top level
        (Value::Array(o), i) if !i.is_object() => o.iter().any(|ov| json_eq(ov, i)),
        (Value::Object(_), _) | (Value::Array(_), _) => false,
        (o, i) => json_eq(o, i),
    }
}

/// `?` key existence.
pub(crate) fn has_key(value: &Value, key: &str) -> bool {
    match value {
        Value::Object(map) => map.contains_key(key),
        Value::Array(items) => items.iter().any(|v| v.as_str() == Some(key)),
        Value::String(s) => s == key,
        _ => false,
    }
}

/// `||` concatenation.
pub(crate) fn concat(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut merged = l.clone();
            for (k, v) in r {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        (Value::Array(l), Value::Array(r)) => {
            Value::Array(l.iter().chain(r).cloned().collect())
        }
        (Value::Array(l), r) => {
            let mut items = l.clone();
            items.push(r.clone());
            Value::Array(items)
        }
        (l, Value::Array(r)) => {
            let mut items = vec![l.clone()];
            items.extend(r.iter().cloned());
            Value::Array(items)
        }
        (l, r) => Value::Array(vec![l.clone(), r.clone()]),
    }
}

/// Resolve a possibly negative index against an array length.
pub(crate) fn resolve_index(len: usize, index: i64) -> Option<usize> {
    if index >= 0 {
        let i = usize::try_from(index).ok()?;
        (i < len).then_some(i)
    } else {
        let back = i64::try_from(len).ok()? + index;
        usize::try_from(back).ok()
    }
}

fn path_index(segment: &str, position: usize) -> QueryResult<i64> {
    segment.parse::<i64>().map_err(|_| {
        QueryError::Evaluation(format!(
            "path element at position {} is not an integer: \"{}\"",
            position + 1,
            segment
        ))
    })
}

/// `#>` lookup. Missing steps yield `None`.
pub(crate) fn get_path<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index = segment.parse::<i64>().ok()?;
                items.get(resolve_index(items.len(), index)?)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// `jsonb_set` with missing keys created at the last step only.
pub(crate) fn set_path(target: &Value, path: &[String], new_value: Value) -> QueryResult<Value> {
    if !(target.is_object() || target.is_array()) {
        return Err(QueryError::Evaluation(
            "cannot set path in scalar".to_string(),
        ));
    }
    let mut result = target.clone();
    set_in(&mut result, path, new_value, 0)?;
    Ok(result)
}

fn set_in(current: &mut Value, path: &[String], new_value: Value, depth: usize) -> QueryResult<()> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(());
    };

    match current {
        Value::Object(map) => {
            if rest.is_empty() {
                map.insert(head.clone(), new_value);
            } else if let Some(child) = map.get_mut(head) {
                set_in(child, rest, new_value, depth + 1)?;
            }
        }
        Value::Array(items) => {
            let index = path_index(head, depth)?;
            match resolve_index(items.len(), index) {
                Some(i) if rest.is_empty() => items[i] = new_value,
                Some(i) => set_in(&mut items[i], rest, new_value, depth + 1)?,
                None if rest.is_empty() => {
                    if index < 0 {
                        items.insert(0, new_value);
                    } else {
                        items.push(new_value);
                    }
                }
                None => {}
            }
        }
        _ => {}
    }
    Ok(())
}

/// `#-` removal. Missing paths leave the value unchanged.
pub(crate) fn delete_path(target: &Value, path: &[String]) -> QueryResult<Value> {
    if !(target.is_object() || target.is_array()) {
        return Err(QueryError::Evaluation(
            "cannot delete path in scalar".to_string(),
        ));
    }
    let mut result = target.clone();
    delete_in(&mut result, path, 0)?;
    Ok(result)
}

fn delete_in(current: &mut Value, path: &[String], depth: usize) -> QueryResult<()> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(());
    };

    match current {
        Value::Object(map) => {
            if rest.is_empty() {
                map.remove(head);
            } else if let Some(child) = map.get_mut(head) {
                delete_in(child, rest, depth + 1)?;
            }
        }
        Value::Array(items) => {
            let index = path_index(head, depth)?;
            if let Some(i) = resolve_index(items.len(), index) {
                if rest.is_empty() {
                    items.remove(i);
                } else {
                    delete_in(&mut items[i], rest, depth + 1)?;
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// `-` with a text key.
pub(crate) fn delete_key(target: &Value, key: &str) -> QueryResult<Value> {
    match target {
        Value::Object(map) => {
            let mut result: Map<String, Value> = map.clone();
            result.remove(key);
            Ok(Value::Object(result))
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .filter(|v| v.as_str() != Some(key))
                .cloned()
                .collect(),
        )),
        _ => Err(QueryError::Evaluation(
            "cannot delete from scalar".to_string(),
        )),
    }
}

/// `-` with an integer index.
pub(crate) fn delete_index(target: &Value, index: i64) -> QueryResult<Value> {
    match target {
        Value::Array(items) => {
            let mut result = items.clone();
            if let Some(i) = resolve_index(items.len(), index) {
                result.remove(i);
            }
            Ok(Value::Array(result))
        }
        Value::Object(_) => Err(QueryError::Evaluation(
            "cannot delete from object using integer index".to_string(),
        )),
        _ => Err(QueryError::Evaluation(
            "cannot delete from scalar".to_string(),
        )),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numeric_equality() {
        assert!(json_eq(&json!(1), &json!(1.0)));
        assert!(json_eq(&json!({"a": [1, 2]}), &json!({"a": [1.0, 2]})));
        assert!(!json_eq(&json!([1, 2]), &json!([2, 1])));
    }

    #[test]
    fn test_containment() {
        assert!(contains(&json!({"a": 1, "b": 2}), &json!({"a": 1})));
        assert!(contains(&json!([1, 2, 3]), &json!([3, 1])));
        assert!(contains(&json!(["a", "b"]), &json!("a")));
        assert!(!contains(&json!({"a": {"b": 1}}), &json!({"b": 1})));
        assert!(contains(&json!({"a": {"b": 1, "c": 2}}), &json!({"a": {"b": 1}})));
    }

    #[test]
    fn test_set_path() {
        let doc = json!({"tags": {"primary": "a"}});
        assert_eq!(
            set_path(&doc, &path(&["tags", "primary"]), json!("x")).unwrap(),
            json!({"tags": {"primary": "x"}})
        );

        // Only the last step is created
        assert_eq!(
            set_path(&doc, &path(&["tags", "new"]), json!(1)).unwrap(),
            json!({"tags": {"primary": "a", "new": 1}})
        );
        assert_eq!(
            set_path(&doc, &path(&["missing", "new"]), json!(1)).unwrap(),
            doc
        );

        // Out of range indexes append or prepend
        assert_eq!(
            set_path(&json!([1, 2]), &path(&["5"]), json!(3)).unwrap(),
            json!([1, 2, 3])
        );
        assert_eq!(
            set_path(&json!([1, 2]), &path(&["-5"]), json!(0)).unwrap(),
            json!([0, 1, 2])
        );

        assert!(set_path(&json!(1), &path(&["a"]), json!(2)).is_err());
        assert!(set_path(&json!([1]), &path(&["a"]), json!(2)).is_err());
    }

    #[test]
    fn test_delete_path() {
        let doc = json!({"a": {"b": [1, 2, 3]}});
        assert_eq!(
            delete_path(&doc, &path(&["a", "b", "-1"])).unwrap(),
            json!({"a": {"b": [1, 2]}})
        );
        assert_eq!(delete_path(&doc, &path(&["x", "y"])).unwrap(), doc);
    }

    #[test]
    fn test_delete_key_and_index() {
        assert_eq!(
            delete_key(&json!(["a", "b", "a"]), "a").unwrap(),
            json!(["b"])
        );
        assert_eq!(delete_index(&json!([1, 2, 3]), -1).unwrap(), json!([1, 2]));
        assert!(delete_index(&json!({"a": 1}), 0).is_err());
        assert!(delete_key(&json!("a"), "a").is_err());
    }
}
