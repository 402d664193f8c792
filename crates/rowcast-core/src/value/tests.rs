use crate::value::{ConversionError, DataType, Float64, FromValue, Value};
use std::collections::HashSet;

// ---- helpers -----------------------------------------------------------

fn v_txt(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn v_f(x: f64) -> Value {
    Value::Float(Float64::new(x))
}

#[test]
fn float_keys_treat_signed_zero_and_nan_as_equal() {
    let mut keys = HashSet::new();
    keys.insert(v_f(0.0));
    keys.insert(v_f(-0.0));
    keys.insert(v_f(f64::NAN));
    keys.insert(v_f(-f64::NAN));

    assert_eq!(keys.len(), 2);
}

#[test]
fn integers_widen_and_range_check() {
    assert_eq!(i64::from_value(&Value::Uint(7)), Ok(7));
    assert_eq!(u64::from_value(&Value::Int(7)), Ok(7));
    assert_eq!(i32::from_value(&Value::Int(-3)), Ok(-3));

    let err = u8::from_value(&Value::Int(300)).expect_err("300 does not fit in u8");
    assert!(matches!(err, ConversionError::OutOfRange { ref target, .. } if target == "u8"));

    let err = u64::from_value(&Value::Int(-1)).expect_err("negative into u64");
    assert!(matches!(err, ConversionError::OutOfRange { .. }));
}

#[test]
fn floats_convert_to_integers_only_when_integral() {
    assert_eq!(i64::from_value(&v_f(42.0)), Ok(42));
    assert!(i64::from_value(&v_f(42.5)).is_err());
    assert!(i64::from_value(&v_f(f64::INFINITY)).is_err());
}

#[test]
fn floats_above_i64_range_still_fit_u64() {
    assert_eq!(u64::from_value(&v_f(1e19)), Ok(10_000_000_000_000_000_000));
    assert_eq!(u64::from_value(&v_f(-0.0)), Ok(0));

    let err = u64::from_value(&v_f(2e19)).expect_err("beyond u64::MAX");
    assert!(matches!(err, ConversionError::OutOfRange { ref target, .. } if target == "u64"));

    let err = u64::from_value(&v_f(-1.0)).expect_err("negative into u64");
    assert!(matches!(err, ConversionError::OutOfRange { ref target, .. } if target == "u64"));
}

#[test]
fn text_parses_into_numbers_and_bools() {
    assert_eq!(i64::from_value(&v_txt(" 12 ")), Ok(12));
    assert_eq!(f64::from_value(&v_txt("1.5")), Ok(1.5));
    assert_eq!(bool::from_value(&v_txt("TRUE")), Ok(true));
    assert_eq!(bool::from_value(&Value::Int(0)), Ok(false));

    let err = i16::from_value(&v_txt("abc")).expect_err("not a number");
    assert!(matches!(err, ConversionError::Parse { ref target, .. } if target == "i16"));
}

#[test]
fn null_converts_only_into_option_or_value() {
    assert_eq!(Option::<i64>::from_value(&Value::Null), Ok(None));
    assert_eq!(Value::from_value(&Value::Null), Ok(Value::Null));
    assert_eq!(Option::<i64>::from_value(&Value::Int(5)), Ok(Some(5)));

    let err = String::from_value(&Value::Null).expect_err("null into string");
    assert_eq!(err.to_string(), "cannot convert NULL into string");
}

#[test]
fn scalars_render_as_text() {
    assert_eq!(String::from_value(&Value::Int(-4)), Ok("-4".to_string()));
    assert_eq!(String::from_value(&Value::Bool(true)), Ok("true".to_string()));
    assert!(String::from_value(&Value::Blob(vec![1])).is_err());
}

#[test]
fn coerce_to_declared_type_keeps_null() {
    assert_eq!(Value::Null.coerce_to(DataType::Int), Ok(Value::Null));
    assert_eq!(v_txt("9").coerce_to(DataType::Uint), Ok(Value::Uint(9)));
    assert_eq!(Value::Int(3).coerce_to(DataType::Float), Ok(v_f(3.0)));
    assert_eq!(Value::Int(3).coerce_to(DataType::Any), Ok(Value::Int(3)));

    let err = Value::Int(3)
        .coerce_to(DataType::List)
        .expect_err("int is not a list");
    assert!(matches!(
        err,
        ConversionError::Incompatible {
            found: DataType::Int,
            ..
        }
    ));
}

#[test]
fn display_renders_blobs_and_lists() {
    let list = Value::List(vec![Value::Int(1), Value::Null, Value::Blob(vec![0xab, 0x01])]);

    assert_eq!(list.to_string(), "[1, NULL, 0xab01]");
}

#[test]
fn option_into_value_maps_none_to_null() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("x")), v_txt("x"));
}

#[test]
fn value_serializes_with_serde() {
    let encoded = serde_json::to_string(&Value::Int(5)).expect("serialize value");
    let decoded: Value = serde_json::from_str(&encoded).expect("deserialize value");

    assert_eq!(decoded, Value::Int(5));
}
