use serde_json::{Value, json};

use super::{Datum, Evaluator, Row};
use crate::error::QueryError;
use crate::expr::{Column, Constant, Expression};
use crate::sql::update::UpdateSet;
use crate::types::SqlType;

fn meta() -> Expression {
    Expression::column(&Column::jsonb("meta"))
}

fn row(value: Option<Value>) -> Row {
    match value {
        Some(v) => Row::new().with_json("meta", v),
        None => Row::new(),
    }
}

fn eval(expr: &Expression, row: &Row) -> Datum {
    Evaluator::new().evaluate(expr, row).unwrap()
}

fn truth(expr: &Expression, row: &Row) -> Option<bool> {
    Evaluator::new().evaluate_bool(expr, row).unwrap()
}

#[test]
fn test_is_empty_array() {
    let expr = meta().is_empty_array().unwrap();

    assert_eq!(truth(&expr, &row(None)), Some(true));
    assert_eq!(truth(&expr, &row(Some(json!(null)))), Some(true));
    assert_eq!(truth(&expr, &row(Some(json!([])))), Some(true));
    assert_eq!(truth(&expr, &row(Some(json!([1])))), Some(false));
    assert_eq!(truth(&expr, &row(Some(json!({"a": 1})))), Some(false));
    assert_eq!(truth(&expr, &row(Some(json!("text")))), Some(false));
}

#[test]
fn test_is_null_and_is_not_null_complementary() {
    let is_null = meta().is_null().unwrap();
    let is_not_null = meta().is_not_null().unwrap();
    let both = is_null.and(is_not_null.clone()).unwrap();

    let samples = [
        None,
        Some(json!(null)),
        Some(json!(0)),
        Some(json!("")),
        Some(json!([])),
        Some(json!({})),
        Some(json!({"a": null})),
    ];
    for sample in samples {
        let r = row(sample.clone());
        let null = truth(&is_null, &r);
        let not_null = truth(&is_not_null, &r);

        assert!(null.is_some() && not_null.is_some(), "{:?}", sample);
        assert_ne!(null, not_null, "{:?}", sample);
        assert!(!Evaluator::new().matches(&both, &r).unwrap(), "{:?}", sample);
    }
}

#[test]
fn test_plain_is_null_only_sees_sql_null() {
    let expr = meta().is_sql_null().unwrap();
    assert_eq!(truth(&expr, &row(None)), Some(true));
    assert_eq!(truth(&expr, &row(Some(json!(null)))), Some(false));
}

#[test]
fn test_is_array() {
    let expr = meta().is_array().unwrap();
    assert_eq!(truth(&expr, &row(Some(json!([1])))), Some(true));
    assert_eq!(truth(&expr, &row(Some(json!({})))), Some(false));
    assert_eq!(truth(&expr, &row(None)), Some(false));
}

#[test]
fn test_navigation() {
    let doc = row(Some(json!({"tags": {"primary": "x"}, "list": [1, 2, 3]})));

    assert_eq!(
        eval(&meta().get(&["tags", "primary"]).unwrap(), &doc),
        Datum::Json(json!("x"))
    );
    assert_eq!(
        eval(&meta().get_text(&["tags.primary"]).unwrap(), &doc),
        Datum::Text("x".to_string())
    );
    assert_eq!(
        eval(&meta().get_key("list").unwrap().get_index(-1).unwrap(), &doc),
        Datum::Json(json!(3))
    );
    assert_eq!(
        eval(&meta().get(&["list", "1"]).unwrap(), &doc),
        Datum::Json(json!(2))
    );
    assert_eq!(eval(&meta().get_key("missing").unwrap(), &doc), Datum::Null);
    assert_eq!(eval(&meta().get_key("x").unwrap(), &row(None)), Datum::Null);
}

#[test]
fn test_casts() {
    let doc = row(Some(json!({"n": 42, "s": "7", "b": true})));

    assert_eq!(
        eval(&meta().get_key("n").unwrap().as_integer().unwrap(), &doc),
        Datum::Integer(42)
    );
    assert_eq!(
        eval(&meta().get_key("s").unwrap().as_long().unwrap(), &doc),
        Datum::Integer(7)
    );
    assert_eq!(
        eval(&meta().get_key("b").unwrap().as_boolean().unwrap(), &doc),
        Datum::Boolean(true)
    );
    assert_eq!(
        eval(&meta().get_key("n").unwrap().as_number().unwrap(), &doc),
        Datum::Number(42.0)
    );
}

#[test]
fn test_get_then_delete_by_path() {
    let doc = row(Some(json!({"a": {"b": {"c": 1, "d": 2}}})));
    let expr = meta()
        .get(&["a"])
        .unwrap()
        .delete_by_path(&["b", "c"])
        .unwrap();

    assert_eq!(eval(&expr, &doc), Datum::Json(json!({"b": {"d": 2}})));
}

#[test]
fn test_mutations() {
    let doc = row(Some(json!({"a": 1, "tags": ["x", "y"]})));

    assert_eq!(
        eval(&meta().set_value(&["b"], json!([true])).unwrap(), &doc),
        Datum::Json(json!({"a": 1, "b": [true], "tags": ["x", "y"]}))
    );
    assert_eq!(
        eval(&meta().delete_by_key("a").unwrap(), &doc),
        Datum::Json(json!({"tags": ["x", "y"]}))
    );
    assert_eq!(
        eval(
            &meta().get_key("tags").unwrap().concat_values(["z"]).unwrap(),
            &doc
        ),
        Datum::Json(json!(["x", "y", "z"]))
    );
    assert_eq!(
        eval(&meta().get_key("tags").unwrap().delete_by_index(0).unwrap(), &doc),
        Datum::Json(json!(["y"]))
    );
}

#[test]
fn test_containment_and_keys() {
    let doc = row(Some(json!({"a": 1, "tags": ["x", "y"]})));

    assert_eq!(truth(&meta().contains_key("a").unwrap(), &doc), Some(true));
    assert_eq!(truth(&meta().contains_key("z").unwrap(), &doc), Some(false));
    assert_eq!(
        truth(&meta().contains_value(json!({"tags": ["y"]})).unwrap(), &doc),
        Some(true)
    );
    assert_eq!(
        eval(&meta().keys().unwrap(), &doc),
        Datum::Array(vec![json!("a"), json!("tags")])
    );
    assert_eq!(
        eval(&meta().get_key("tags").unwrap().size().unwrap(), &doc),
        Datum::Integer(2)
    );
}

#[test]
fn test_size_of_non_array_fails() {
    let err = Evaluator::new()
        .evaluate(&meta().size().unwrap(), &row(Some(json!({"a": 1}))))
        .unwrap_err();
    assert!(matches!(err, QueryError::Evaluation(_)));
}

#[test]
fn test_in_and_coalesce() {
    let status = Expression::column(&Column::new("status", SqlType::Text));
    let expr = status.is_in(["open", "closed"]).unwrap();

    let open = Row::new().with("status", Datum::Text("open".to_string()));
    let other = Row::new().with("status", Datum::Text("draft".to_string()));
    assert_eq!(truth(&expr, &open), Some(true));
    assert_eq!(truth(&expr, &other), Some(false));
    assert_eq!(truth(&expr, &Row::new()), None);

    let fallback = meta()
        .coalesce([Constant::jsonb(json!({})).into()])
        .unwrap();
    assert_eq!(eval(&fallback, &row(None)), Datum::Json(json!({})));
}

#[test]
fn test_build_object() {
    let expr = crate::expr::build_object([
        ("id", Expression::value(1)),
        ("doc", meta()),
        ("gone", Constant::null().into()),
    ])
    .unwrap();

    assert_eq!(
        eval(&expr, &row(Some(json!([1])))),
        Datum::Json(json!({"id": 1, "doc": [1], "gone": null}))
    );
}

#[test]
fn test_lowered_update_applies_patches() {
    let update = UpdateSet::builder("t")
        .set_json(&Column::jsonb("meta"), "tags.primary", "x")
        .unwrap()
        .set_json(&Column::jsonb("meta"), "count", 3)
        .unwrap()
        .build()
        .unwrap();

    let lowered = update.lower().unwrap();
    assert_eq!(lowered.len(), 1);

    let (_, value) = &lowered[0];
    let doc = row(Some(json!({"tags": {"primary": "a"}})));
    assert_eq!(
        eval(value, &doc),
        Datum::Json(json!({"tags": {"primary": "x"}, "count": 3}))
    );
}

#[test]
fn test_case_when_evaluates_chosen_branch_only() {
    // SIZE on an object fails; the condition keeps it from running
    let expr = Expression::case_when(
        meta().is_array().unwrap(),
        meta().size().unwrap(),
        Constant::integer(-1).into(),
    )
    .unwrap();

    assert_eq!(eval(&expr, &row(Some(json!({"a": 1})))), Datum::Integer(-1));
    assert_eq!(eval(&expr, &row(Some(json!([1, 2])))), Datum::Integer(2));
    assert_eq!(eval(&expr, &row(None)), Datum::Integer(-1));
}

#[test]
fn test_int4_index_operand() {
    let doc = row(Some(json!([10, 20, 30])));
    let expr = meta().get_index(1).unwrap();
    assert_eq!(eval(&expr, &doc), Datum::Json(json!(20)));
    assert_eq!(
        eval(&meta().delete_by_index(-1).unwrap(), &doc),
        Datum::Json(json!([10, 20]))
    );
}
