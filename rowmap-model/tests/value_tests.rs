use rowmap_model::{Entity, Value};
use proptest::prelude::*;

// ── Truthiness ───────────────────────────────────────────────────

#[test]
fn falsy_values() {
    for v in [
        Value::Null,
        Value::Bool(false),
        Value::Integer(0),
        Value::Real(0.0),
        Value::Text(String::new()),
        Value::Text("0".into()),
        Value::Blob(Vec::new()),
        Value::List(Vec::new()),
    ] {
        assert!(!v.is_truthy(), "{v:?} should be falsy");
    }
}

#[test]
fn truthy_values() {
    for v in [
        Value::Bool(true),
        Value::Integer(-1),
        Value::Real(0.5),
        Value::Text("00".into()),
        Value::Text("false".into()),
        Value::Entity(Box::new(Entity::new())),
        Value::List(vec![Value::Null]),
    ] {
        assert!(v.is_truthy(), "{v:?} should be truthy");
    }
}

#[test]
fn scalar_classification() {
    assert!(Value::Integer(1).is_scalar());
    assert!(Value::Null.is_scalar());
    assert!(Value::Blob(vec![1]).is_scalar());
    assert!(!Value::List(vec![]).is_scalar());
    assert!(!Value::Entity(Box::new(Entity::new())).is_scalar());
}

#[test]
fn option_conversion() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
}

#[test]
fn json_numbers_keep_integer_kind() {
    assert_eq!(Value::from(serde_json::json!(3)), Value::Integer(3));
    assert_eq!(Value::from(serde_json::json!(2.5)), Value::Real(2.5));
}

proptest! {
    #[test]
    fn nonzero_integers_are_truthy(i in any::<i64>().prop_filter("nonzero", |i| *i != 0)) {
        prop_assert!(Value::Integer(i).is_truthy());
    }

    #[test]
    fn text_truthiness(s in "[a-z0-9]{0,8}") {
        let expected = !(s.is_empty() || s == "0");
        prop_assert_eq!(Value::Text(s).is_truthy(), expected);
    }
}
