use pretty_assertions::assert_eq;
use rowmap_model::{Entity, ModelError, Value};
use serde_json::json;

fn make_entity() -> Entity {
    Entity::new()
        .with("ID", 7)
        .with("Name", "Alice")
        .with("Active", true)
}

// ── Get / set ────────────────────────────────────────────────────

#[test]
fn unset_property_reads_as_null() {
    let e = make_entity();
    assert_eq!(e.get("Missing"), &Value::Null);
    assert!(!e.contains("Missing"));
}

#[test]
fn set_replaces_in_place_and_keeps_order() {
    let mut e = make_entity();
    e.set("ID", 8);
    let keys: Vec<&str> = e.keys().collect();
    assert_eq!(keys, vec!["ID", "Name", "Active"]);
    assert_eq!(e.get("ID"), &Value::Integer(8));
}

#[test]
fn contains_is_false_for_explicit_null() {
    let mut e = make_entity();
    e.set("Email", Value::Null);
    assert!(!e.contains("Email"));
    assert_eq!(e.len(), 4);
}

#[test]
fn remove_returns_previous_value() {
    let mut e = make_entity();
    assert_eq!(e.remove("Name"), Some(Value::Text("Alice".into())));
    assert_eq!(e.remove("Name"), None);
    assert_eq!(e.len(), 2);
}

#[test]
fn get_mut_edits_value() {
    let mut e = make_entity();
    if let Some(v) = e.get_mut("Name") {
        *v = Value::from("Bob");
    }
    assert_eq!(e.get("Name").as_str(), Some("Bob"));
    assert!(e.get_mut("Nope").is_none());
}

// ── JSON ─────────────────────────────────────────────────────────

#[test]
fn to_json_expands_nested_entities() {
    let inner = Entity::new().with("City", "Oslo");
    let e = make_entity()
        .with("Address", inner)
        .with("Tags", Value::List(vec!["a".into(), "b".into()]));

    assert_eq!(
        e.to_json(),
        json!({
            "ID": 7,
            "Name": "Alice",
            "Active": true,
            "Address": {"City": "Oslo"},
            "Tags": ["a", "b"]
        })
    );
}

#[test]
fn serialize_matches_to_json() {
    let e = make_entity().with("Score", 1.5).with("Note", Value::Null);
    let via_serde: serde_json::Value = serde_json::to_value(&e).unwrap();
    assert_eq!(via_serde, e.to_json());
}

#[test]
fn from_json_builds_nested_values() {
    let e = Entity::from_json(json!({
        "Name": "Carol",
        "Roles": [1, 2],
        "Profile": {"Bio": "hi"}
    }))
    .unwrap();

    assert_eq!(e.get("Name").as_str(), Some("Carol"));
    assert_eq!(
        e.get("Roles"),
        &Value::List(vec![Value::Integer(1), Value::Integer(2)])
    );
    match e.get("Profile") {
        Value::Entity(profile) => assert_eq!(profile.get("Bio").as_str(), Some("hi")),
        other => panic!("expected nested entity, got {other:?}"),
    }
}

#[test]
fn from_json_rejects_non_object() {
    let err = Entity::from_json(json!([1, 2, 3])).unwrap_err();
    assert!(matches!(err, ModelError::MalformedEntity(_)));
    assert!(err.to_string().contains("an array"));
}

// ── Clone ────────────────────────────────────────────────────────

#[test]
fn entity_clone_is_independent() {
    let e = make_entity();
    let mut cloned = e.clone();
    cloned.set("Name", "Mallory");

    assert_eq!(e.get("Name").as_str(), Some("Alice"));
    assert_eq!(cloned.get("Name").as_str(), Some("Mallory"));
}

#[test]
fn collect_from_pairs() {
    let e: Entity = vec![
        ("A".to_string(), Value::Integer(1)),
        ("B".to_string(), Value::Integer(2)),
        ("A".to_string(), Value::Integer(3)),
    ]
    .into_iter()
    .collect();
    assert_eq!(e.len(), 2);
    assert_eq!(e.get("A"), &Value::Integer(3));
}
