/// Builder and conversion tests through the public API.
///
/// These verify that what the fluent surface produces is exactly what goes
/// on the wire, without needing a live service.

use dstore_client::convert;
use dstore_client::{
    Batch, ClientError, Delete, Entity, Insert, Key, Mutations, PathElement, Update, Upsert, Value,
};
use dstore_proto as proto;

fn task(name: &str) -> Entity {
    Entity::new(Key::with_name("Task", name))
        .property("done", false)
        .property("priority", 4i64)
}

#[test]
fn entity_conversion_is_lossless() {
    let entity = task("t1")
        .property("note", Value::from("internal").unindexed())
        .property(
            "tags",
            vec![Value::from("a"), Value::from("b")],
        )
        .property("owner", Key::with_id("User", 7))
        .property(
            "address",
            Entity::embedded().property("city", "Zurich"),
        );

    let wire = convert::entity_to_proto(&entity);
    let back = convert::proto_to_entity(wire).unwrap();
    assert_eq!(back, entity);
}

#[test]
fn mutations_lower_to_the_expected_operations() {
    let mutations = Batch::new()
        .insert(task("a"))
        .update(task("b"))
        .upsert(task("c"))
        .delete(Key::with_name("Task", "d"))
        .into_mutations()
        .unwrap();

    use proto::mutation::Operation;
    assert_eq!(mutations.len(), 4);
    assert!(matches!(mutations[0].operation, Some(Operation::Insert(_))));
    assert!(matches!(mutations[1].operation, Some(Operation::Update(_))));
    assert!(matches!(mutations[2].operation, Some(Operation::Upsert(_))));
    let Some(Operation::Delete(ref key)) = mutations[3].operation else {
        panic!("expected delete");
    };
    assert_eq!(key.path[0].kind, "Task");
}

#[test]
fn single_statements_match_their_batch_equivalents() {
    let single = Insert::new(task("x")).into_mutations().unwrap();
    let batched = Batch::new().insert(task("x")).into_mutations().unwrap();
    assert_eq!(single, batched);

    let single = Upsert::new(task("y")).into_mutations().unwrap();
    let batched = Batch::new().upsert(task("y")).into_mutations().unwrap();
    assert_eq!(single, batched);
}

#[test]
fn key_validation_surfaces_as_invalid_argument() {
    let err = Update::new(Entity::new(Key::incomplete("Task")))
        .into_mutations()
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));

    let err = Delete::new(Key::incomplete("Task"))
        .into_mutations()
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
}

#[test]
fn ancestor_paths_convert_in_order() {
    let key = Key::with_name("Org", "acme")
        .child(PathElement::with_id("Team", 3))
        .unwrap()
        .child(PathElement::incomplete("User"))
        .unwrap();

    let wire = convert::key_to_proto(&key);
    assert_eq!(wire.path.len(), 3);
    assert_eq!(wire.path[0].kind, "Org");
    assert_eq!(wire.path[2].kind, "User");
    assert!(wire.path[2].id_type.is_none());
}
