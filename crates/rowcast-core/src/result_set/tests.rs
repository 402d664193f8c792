use super::*;
use crate::{
    convert::converter,
    error::ErrorClass,
    extract::{field_as, field_with, into_type, mapped, project, row},
    mapper::mapping,
    schema::Column,
};
use proptest::prelude::*;

fn rows_of(names: &[&str], data: Vec<Vec<Value>>) -> RowSet {
    let schema = Arc::new(Schema::of(names));
    let rows = data
        .into_iter()
        .map(|values| Row::new(Arc::clone(&schema), values).expect("row"))
        .collect();

    RowSet::new(schema, rows)
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

// k, v, tag
fn kv_rows() -> RowSet {
    rows_of(
        &["k", "v", "tag"],
        vec![
            vec![Value::Int(1), text("a"), text("x")],
            vec![Value::Int(2), text("c"), text("y")],
            vec![Value::Int(1), text("b"), text("x")],
        ],
    )
}

#[test]
fn map_is_last_write_wins() {
    let map = kv_rows().to_map("k", "v").expect("map");

    assert_eq!(map.len(), 2);
    assert_eq!(map[&Value::Int(1)], text("b"));
    assert_eq!(map[&Value::Int(2)], text("c"));
}

#[test]
fn groups_keep_row_order_per_key() {
    let groups = kv_rows().to_groups("k", "v").expect("groups");

    assert_eq!(groups[&Value::Int(1)], vec![text("a"), text("b")]);
    assert_eq!(groups[&Value::Int(2)], vec![text("c")]);
}

#[test]
fn map_by_stores_whole_rows() {
    let map = kv_rows().to_map_by(0usize).expect("map");

    assert_eq!(map[&Value::Int(1)].get("v"), Ok(&text("b")));
}

#[test]
fn groups_by_yields_row_sets_sharing_the_schema() {
    let rows = kv_rows();
    let groups = rows.to_groups_by(Column::<i64>::new("k")).expect("groups");

    let ones = &groups[&1];
    assert_eq!(ones.len(), 2);
    assert!(Arc::ptr_eq(ones.schema(), rows.schema()));
    assert_eq!(ones.values("v").expect("values"), vec![text("a"), text("b")]);
}

#[test]
fn composite_keys_compare_structurally() {
    let groups = kv_rows()
        .to_groups(["k", "tag"], field_as::<String, _>("v"))
        .expect("groups");

    assert_eq!(
        groups[&vec![Value::Int(1), text("x")]],
        vec!["a".to_string(), "b".to_string()]
    );
}

#[test]
fn projected_record_keys() {
    let map = kv_rows()
        .to_map(project(["k", "tag"]), "v")
        .expect("map");

    assert_eq!(map.len(), 2);
    let key = map
        .keys()
        .find(|key| key.get("k") == Ok(&Value::Int(2)))
        .expect("key for k = 2");
    assert_eq!(key.schema().names(), vec!["k", "tag"]);
}

#[test]
fn value_coercion_paths_are_uniform() {
    let rows = kv_rows();

    // raw
    let raw = rows.to_map("k", "v").expect("raw");
    assert_eq!(raw[&Value::Int(2)], text("c"));

    // target type
    let typed = rows
        .to_map(field_as::<u8, _>("k"), field_as::<String, _>("v"))
        .expect("typed");
    assert_eq!(typed[&2], "c");

    // converter
    let converted = rows
        .to_groups("tag", field_with("v", converter(|s: String| s.to_uppercase())))
        .expect("converted");
    assert_eq!(converted[&text("x")], vec!["A".to_string(), "B".to_string()]);

    // whole-row mapping
    let mapped_rows = rows
        .to_groups(
            into_type::<(i64,)>(),
            mapped(mapping(|k: i64, v: String| format!("{k}{v}"))),
        )
        .expect("mapped");
    assert_eq!(mapped_rows[&(1,)], vec!["1a".to_string(), "1b".to_string()]);

    // explicit whole row
    let whole = rows.to_map("v", row()).expect("whole");
    assert_eq!(whole[&text("a")].get_as::<i64, _>("k"), Ok(1));
}

#[test]
fn user_function_keys() {
    let by_parity = kv_rows()
        .to_groups(
            mapped(|row: &Row| row.get_as::<i64, _>("k").map(|k| k % 2 == 0)),
            "v",
        )
        .expect("groups");

    assert_eq!(by_parity[&false], vec![text("a"), text("b")]);
    assert_eq!(by_parity[&true], vec![text("c")]);
}

#[test]
fn unknown_key_field_fails_even_when_empty() {
    let empty = RowSet::empty(Arc::new(Schema::of(&["k"])));
    let err = empty.to_map("missing", "k").expect_err("unknown field");

    assert_eq!(err.class, ErrorClass::UnknownField);
    assert!(empty.to_map("k", "k").expect("empty map").is_empty());
}

#[test]
fn failing_value_extraction_aborts_the_map() {
    let err = kv_rows()
        .to_map("k", field_as::<i64, _>("v"))
        .expect_err("text is not an integer");

    assert_eq!(err.class, ErrorClass::Conversion);
}

#[test]
fn sets_lists_and_conversions() {
    let rows = kv_rows();

    assert_eq!(rows.to_set("tag").expect("set").len(), 2);
    assert_eq!(
        rows.to_types::<(i64, String)>().expect("tuples")[2],
        (1, "b".to_string())
    );
    assert_eq!(rows.to_arrays()[1], vec![Value::Int(2), text("c"), text("y")]);
    assert_eq!(rows.to_maps()[0]["tag"], text("x"));
    assert_eq!(
        rows.map_rows(&mapping(|k: i64| k * 10)).expect("mapped"),
        vec![10, 20, 10]
    );
}

#[test]
fn row_set_iterates_and_derefs_in_order() {
    let rows = kv_rows();
    let by_ref = (&rows).into_iter().map(|row| row.values()[1].clone()).collect::<Vec<_>>();

    assert_eq!(by_ref, vec![text("a"), text("c"), text("b")]);
    assert_eq!(rows.first().map(Row::len), Some(3));
    assert_eq!(rows.into_iter().count(), 3);
}

///
/// Properties
///

fn arb_pairs() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..6, any::<i64>()), 0..40)
}

fn pair_rows(pairs: &[(i64, i64)]) -> RowSet {
    rows_of(
        &["k", "v"],
        pairs
            .iter()
            .map(|&(k, v)| vec![Value::Int(k), Value::Int(v)])
            .collect(),
    )
}

proptest! {
    #[test]
    fn map_matches_last_write(pairs in arb_pairs()) {
        let map = pair_rows(&pairs)
            .to_map(field_as::<i64, _>("k"), field_as::<i64, _>("v"))
            .expect("map");

        let mut expected = HashMap::new();
        for &(k, v) in &pairs {
            expected.insert(k, v);
        }
        prop_assert_eq!(map, expected);
    }

    #[test]
    fn groups_preserve_per_key_order(pairs in arb_pairs()) {
        let groups = pair_rows(&pairs)
            .to_groups(field_as::<i64, _>("k"), field_as::<i64, _>("v"))
            .expect("groups");

        for (key, values) in &groups {
            let expected = pairs
                .iter()
                .filter(|(k, _)| k == key)
                .map(|&(_, v)| v)
                .collect::<Vec<_>>();
            prop_assert_eq!(values, &expected);
        }
        let total = groups.values().map(Vec::len).sum::<usize>();
        prop_assert_eq!(total, pairs.len());
    }
}
