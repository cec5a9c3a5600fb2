use rowmap_model::{
    Entity, LoadMode, MappingDescriptor, ModelError, ModelResult, Record, RecordType,
    Relationship, RelationshipLoader, Value,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

/// Loader that answers from memory and records every call.
struct FakeLoader {
    calls: RefCell<Vec<String>>,
    fail: Cell<bool>,
    author: Arc<RecordType>,
}

impl FakeLoader {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            calls: RefCell::new(Vec::new()),
            fail: Cell::new(false),
            author: Arc::new(RecordType::new("User")),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl RelationshipLoader for FakeLoader {
    fn load_mapping(
        &self,
        record: &mut Record,
        property: &str,
        mapping: &MappingDescriptor,
    ) -> ModelResult<()> {
        self.calls.borrow_mut().push(property.to_string());
        if self.fail.get() {
            return Err(ModelError::Load {
                property: property.to_string(),
                message: "store unreachable".to_string(),
            });
        }
        if mapping.relationship().is_singular() {
            let author = Entity::new()
                .with("ID", record.get(mapping.from_field()).clone())
                .with("Name", "Alice");
            record.set(property, Record::from_entity(Arc::clone(&self.author), author));
        } else {
            let comments = vec![Value::from("first"), Value::from("second")];
            record.set(property, Value::List(comments));
        }
        Ok(())
    }
}

fn post_type() -> Arc<RecordType> {
    Arc::new(
        RecordType::new("Post")
            .with_mapping(
                "Author",
                MappingDescriptor::builder(Relationship::ManyToOne, "User.ID")
                    .from_field("AuthorID")
                    .build(),
            )
            .with_mapping(
                "Comments",
                MappingDescriptor::builder(Relationship::OneToMany, "Comment.PostID").build(),
            ),
    )
}

fn post_row() -> Entity {
    Entity::new().with("ID", 1).with("AuthorID", 9).with("Title", "Hello")
}

fn bind(loader: &Rc<FakeLoader>) -> Weak<dyn RelationshipLoader> {
    let loader: Rc<dyn RelationshipLoader> = loader.clone();
    Rc::downgrade(&loader)
}

// ── Hydration modes ──────────────────────────────────────────────

#[test]
fn load_mode_none_resolves_nothing() {
    let loader = FakeLoader::new();
    let post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::None).unwrap();
    assert!(loader.calls().is_empty());
    assert!(post.get("Author").is_null());
    assert!(post.has_loader());
}

#[test]
fn load_mode_no_lazy_resolves_eager_only() {
    let loader = FakeLoader::new();
    let post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::NoLazy).unwrap();
    assert_eq!(loader.calls(), vec!["Author".to_string()]);
    let author = post.get("Author").as_record().unwrap();
    assert_eq!(author.get("ID"), &Value::Integer(9));
    assert!(post.get("Comments").is_null());
}

#[test]
fn load_mode_all_resolves_everything() {
    let loader = FakeLoader::new();
    let post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::All).unwrap();
    let mut calls = loader.calls();
    calls.sort();
    assert_eq!(calls, vec!["Author".to_string(), "Comments".to_string()]);
    assert_eq!(post.get("Comments").as_list().map(<[Value]>::len), Some(2));
}

#[test]
fn hydrate_surfaces_loader_failure() {
    let loader = FakeLoader::new();
    loader.fail.set(true);
    let err = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::NoLazy).unwrap_err();
    assert!(matches!(err, ModelError::Load { .. }));
}

// ── Lazy access ──────────────────────────────────────────────────

#[test]
fn fetch_resolves_unset_mapping_once_set() {
    let loader = FakeLoader::new();
    let mut post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::None).unwrap();

    let comments = post.fetch("Comments").unwrap().clone();
    assert_eq!(comments.as_list().map(<[Value]>::len), Some(2));
    post.fetch("Comments").unwrap();
    assert_eq!(loader.calls(), vec!["Comments".to_string()]);
}

#[test]
fn get_never_loads() {
    let loader = FakeLoader::new();
    let post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::None).unwrap();
    assert!(post.get("Comments").is_null());
    assert!(loader.calls().is_empty());
}

#[test]
fn fetch_of_unmapped_property_is_plain_read() {
    let loader = FakeLoader::new();
    let mut post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::None).unwrap();
    assert!(post.fetch("Subtitle").unwrap().is_null());
    assert_eq!(post.fetch("Title").unwrap().as_str(), Some("Hello"));
    assert!(loader.calls().is_empty());
}

#[test]
fn reload_refetches_even_when_set() {
    let loader = FakeLoader::new();
    let mut post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::NoLazy).unwrap();
    assert!(post.reload("Author").unwrap());
    assert_eq!(loader.calls().len(), 2);
    assert!(!post.reload("Title").unwrap());
}

#[test]
fn failed_lazy_load_leaves_property_untouched() {
    let loader = FakeLoader::new();
    let mut post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::None).unwrap();
    loader.fail.set(true);
    assert!(post.fetch("Comments").is_err());
    assert!(post.get("Comments").is_null());
}

#[test]
fn dropped_loader_means_no_load() {
    let loader = FakeLoader::new();
    let mut post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::None).unwrap();
    drop(loader);
    assert!(!post.has_loader());
    assert!(!post.ensure_loaded("Comments").unwrap());
    assert!(post.fetch("Comments").unwrap().is_null());
}

// ── Keys & equality ──────────────────────────────────────────────

#[test]
fn id_and_alternate_id() {
    let t = Arc::new(RecordType::new("User").with_alternate_key("Username"));
    let mut user = Record::from_entity(t, Entity::new().with("Username", "alice"));
    assert!(user.id().is_null());
    user.set_id(4);
    assert_eq!(user.id(), &Value::Integer(4));
    assert_eq!(user.alternate_id().as_str(), Some("alice"));
}

#[test]
fn equality_ignores_loader_binding() {
    let loader = FakeLoader::new();
    let bound = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::None).unwrap();
    let unbound = Record::from_entity(post_type(), post_row());
    assert_eq!(bound, unbound);
    assert!(format!("{bound:?}").contains("Post"));
}

#[test]
fn nested_record_serializes_as_object() {
    let loader = FakeLoader::new();
    let post = Record::hydrate(post_type(), post_row(), bind(&loader), LoadMode::NoLazy).unwrap();
    let json = serde_json::to_value(Value::from(post.clone())).unwrap();
    assert_eq!(json["Author"]["Name"], "Alice");
    assert_eq!(post.to_json()["Title"], "Hello");
}
