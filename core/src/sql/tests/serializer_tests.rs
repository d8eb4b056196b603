use pretty_assertions::assert_eq;
use serde_json::json;

use crate::config::PlaceholderStyle;
use crate::expr::{Column, Constant, ConstantValue, Expression, build_object};
use crate::sql::dialect::{Dialect, Template};
use crate::sql::serializer::{Serializer, quote_ident};
use crate::types::{SqlType, TypeTag};

fn meta() -> Expression {
    Expression::column(&Column::jsonb("meta"))
}

fn sql(expr: &Expression) -> String {
    Serializer::postgres().serialize(expr).unwrap().sql
}

#[test]
fn test_path_and_key_navigation() {
    assert_eq!(sql(&meta().get(&["tags", "primary"]).unwrap()), "(meta #> ?)");
    assert_eq!(sql(&meta().get_key("tags").unwrap()), "(meta -> ?)");
    assert_eq!(sql(&meta().get_index(0).unwrap()), "(meta -> ?)");
    assert_eq!(sql(&meta().get_text(&["a"]).unwrap()), "(meta #>> ?)");
    assert_eq!(
        sql(&meta().get_key("a").unwrap().get_key_text("b").unwrap()),
        "((meta -> ?) ->> ?)"
    );
}

#[test]
fn test_path_parameter_is_one_array() {
    let compiled = Serializer::postgres()
        .serialize(&meta().get(&["tags.primary"]).unwrap())
        .unwrap();
    assert_eq!(compiled.params.len(), 1);
    assert_eq!(
        compiled.params[0].value(),
        &ConstantValue::ArrayValue(vec![json!("tags"), json!("primary")])
    );
}

#[test]
fn test_get_then_delete_nests_subject() {
    let path = ["a", "b"];
    let inner = meta().get(&path).unwrap();
    let outer = inner.delete_by_path(&path).unwrap();

    let inner_sql = sql(&inner);
    let outer = Serializer::postgres().serialize(&outer).unwrap();

    assert_eq!(outer.sql, format!("({} #- ?)", inner_sql));
    assert_eq!(outer.params.len(), 2);
    assert_eq!(outer.params[0], outer.params[1]);
}

#[test]
fn test_mutation_operators() {
    assert_eq!(sql(&meta().delete_by_key("a").unwrap()), "(meta - ?)");
    assert_eq!(sql(&meta().delete_by_index(-1).unwrap()), "(meta - ?)");
    assert_eq!(
        sql(&meta().set_value(&["a"], 1).unwrap()),
        "jsonb_set(meta, ?, ?)"
    );
    assert_eq!(
        sql(&meta().concat_values([1, 2]).unwrap()),
        "(meta || ?)"
    );
}

#[test]
fn test_chained_sets_nest() {
    let expr = meta()
        .coalesce([Constant::jsonb(json!({})).into()])
        .unwrap()
        .set_value(&["a"], 1)
        .unwrap()
        .set_value(&["b"], 2)
        .unwrap();

    let compiled = Serializer::postgres().serialize(&expr).unwrap();
    assert_eq!(
        compiled.sql,
        "jsonb_set(jsonb_set(coalesce(meta, ?), ?, ?), ?, ?)"
    );
    assert_eq!(compiled.params.len(), 5);
    assert_eq!(compiled.params[0], Constant::jsonb(json!({})));
    assert_eq!(compiled.params[4], Constant::jsonb(2));
}

#[test]
fn test_functions_and_predicates() {
    assert_eq!(sql(&meta().size().unwrap()), "jsonb_array_length(meta)");
    assert_eq!(sql(&meta().keys().unwrap()), "jsonb_object_keys(meta)");
    assert_eq!(sql(&meta().elements().unwrap()), "jsonb_array_elements(meta)");
    assert_eq!(sql(&meta().contains_key("a").unwrap()), "(meta ? ?)");
    assert_eq!(
        sql(&meta().contains_value(json!({"a": 1})).unwrap()),
        "(meta @> ?)"
    );
    assert_eq!(
        sql(&meta().is_null().unwrap()),
        "((meta IS NULL) OR (meta = ?))"
    );
    assert_eq!(
        sql(&meta().is_not_null().unwrap()),
        "((meta IS NOT NULL) AND (meta <> ?))"
    );
}

#[test]
fn test_is_empty_array() {
    assert_eq!(
        sql(&meta().is_empty_array().unwrap()),
        "(((meta IS NULL) OR (meta = ?)) OR \
         (CASE WHEN (((meta IS NOT NULL) AND (meta <> ?)) AND (jsonb_typeof(meta) = ?)) \
         THEN (jsonb_array_length(meta) = ?) ELSE ? END))"
    );
}

#[test]
fn test_case_when() {
    let flag = Expression::column(&Column::new("flag", SqlType::Boolean));
    let expr = Expression::case_when(flag, meta(), Constant::jsonb(json!([])).into()).unwrap();

    assert_eq!(expr.type_tag(), TypeTag::Json);
    assert_eq!(sql(&expr), "(CASE WHEN flag THEN meta ELSE ? END)");
}

#[test]
fn test_casts() {
    assert_eq!(
        sql(&meta().get_key("n").unwrap().as_integer().unwrap()),
        "((meta ->> ?))::integer"
    );
    assert_eq!(
        sql(&meta().get(&["a", "b"]).unwrap().as_number().unwrap()),
        "((meta #>> ?))::numeric"
    );
    assert_eq!(sql(&meta().as_text().unwrap()), "(meta)::text");
}

#[test]
fn test_value_list_expands() {
    let name = Expression::column(&Column::new("name", SqlType::Text));
    let expr = name
        .is_in(["a", "b", "c"])
        .unwrap()
        .and(meta().contains_key("k").unwrap())
        .unwrap();

    let anonymous = Serializer::postgres().serialize(&expr).unwrap();
    assert_eq!(anonymous.sql, "((name IN (?, ?, ?)) AND (meta ? ?))");
    assert_eq!(anonymous.params.len(), 2);
    assert_eq!(anonymous.placeholder_count(), 4);

    let dialect = Dialect::postgres();
    let numbered = Serializer::new(&dialect, PlaceholderStyle::Numbered)
        .serialize(&expr)
        .unwrap();
    assert_eq!(numbered.sql, "((name IN ($1, $2, $3)) AND (meta ? $4))");
}

#[test]
fn test_variadic_operators() {
    let a = meta().contains_key("a").unwrap();
    let b = meta().contains_key("b").unwrap();
    let c = meta().contains_key("c").unwrap();
    assert_eq!(
        sql(&Expression::any_of([a, b, c]).unwrap()),
        "((meta ? ?) OR (meta ? ?) OR (meta ? ?))"
    );

    let obj = build_object([("id", Expression::value(1)), ("doc", meta())]).unwrap();
    assert_eq!(sql(&obj), "jsonb_build_object(?, ?, ?, meta)");
}

#[test]
fn test_template_override() {
    let dialect = Dialect::postgres()
        .with_template("CONTAINS_KEY", Template::new("jsonb_exists({1}, {2})"))
        .unwrap();
    let serializer = Serializer::new(&dialect, PlaceholderStyle::Anonymous);

    let compiled = serializer
        .serialize(&meta().contains_key("a").unwrap())
        .unwrap();
    assert_eq!(compiled.sql, "jsonb_exists(meta, ?)");
}

#[test]
fn test_template_may_repeat_operand() {
    let dialect = Dialect::postgres()
        .with_template(
            "COALESCE",
            Template::new("CASE WHEN {1} IS NULL THEN {2} ELSE {1} END"),
        )
        .unwrap();
    let serializer = Serializer::new(&dialect, PlaceholderStyle::Numbered);

    let expr = meta()
        .get_key("a")
        .unwrap()
        .coalesce([Constant::jsonb(0).into()])
        .unwrap();
    let compiled = serializer.serialize(&expr).unwrap();

    assert_eq!(
        compiled.sql,
        "CASE WHEN (meta -> $1) IS NULL THEN $2 ELSE (meta -> $3) END"
    );
    assert_eq!(compiled.params.len(), 3);
    assert_eq!(compiled.params[0], compiled.params[2]);
}

#[test]
fn test_identifier_quoting() {
    assert_eq!(quote_ident("meta"), "meta");
    assert_eq!(quote_ident("_x1$"), "_x1$");
    assert_eq!(quote_ident("Meta"), "\"Meta\"");
    assert_eq!(quote_ident("1col"), "\"1col\"");
    assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");

    let qualified = Expression::column(&Column::qualified("t", "Doc", SqlType::Jsonb));
    assert_eq!(sql(&qualified.size().unwrap()), "jsonb_array_length(t.\"Doc\")");
}
