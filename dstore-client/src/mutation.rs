/// Mutation builders for commit requests.
///
/// Each statement captures one write; [`Batch`] collects several into a
/// single atomic commit. Key validation happens when the statements are
/// lowered to wire mutations, so building is infallible and errors surface
/// from the commit call.
use crate::convert;
use crate::error::{ClientError, Result};
use dstore_core::{Entity, Key};
use dstore_proto as proto;

/// Anything that lowers to a list of wire mutations.
///
/// Implemented by the individual statements and by [`Batch`]; commit calls
/// accept any implementor.
pub trait Mutations {
    fn into_mutations(self) -> Result<Vec<proto::Mutation>>;
}

fn require_key<'a>(entity: &'a Entity, what: &str) -> Result<&'a Key> {
    entity
        .key()
        .ok_or_else(|| ClientError::InvalidArgument(format!("{what} requires a keyed entity")))
}

fn require_complete(key: &Key, what: &str) -> Result<()> {
    if key.is_complete() {
        Ok(())
    } else {
        Err(ClientError::InvalidArgument(format!(
            "{what} requires a complete key"
        )))
    }
}

/// Insert an entity that must not already exist.
///
/// The key may be incomplete; the service assigns a numeric ID and reports
/// it in the mutation result.
#[derive(Debug, Clone)]
pub struct Insert {
    entity: Entity,
}

impl Insert {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }
}

impl Mutations for Insert {
    fn into_mutations(self) -> Result<Vec<proto::Mutation>> {
        require_key(&self.entity, "insert")?;
        Ok(vec![proto::Mutation {
            operation: Some(proto::mutation::Operation::Insert(convert::entity_to_proto(
                &self.entity,
            ))),
            conflict_detection_strategy: None,
        }])
    }
}

/// Update an entity that must already exist. Requires a complete key.
#[derive(Debug, Clone)]
pub struct Update {
    entity: Entity,
}

impl Update {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }
}

impl Mutations for Update {
    fn into_mutations(self) -> Result<Vec<proto::Mutation>> {
        let key = require_key(&self.entity, "update")?;
        require_complete(key, "update")?;
        Ok(vec![proto::Mutation {
            operation: Some(proto::mutation::Operation::Update(convert::entity_to_proto(
                &self.entity,
            ))),
            conflict_detection_strategy: None,
        }])
    }
}

/// Write an entity whether or not it already exists.
///
/// The key may be incomplete, in which case the service assigns an ID.
#[derive(Debug, Clone)]
pub struct Upsert {
    entity: Entity,
}

impl Upsert {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }
}

impl Mutations for Upsert {
    fn into_mutations(self) -> Result<Vec<proto::Mutation>> {
        require_key(&self.entity, "upsert")?;
        Ok(vec![proto::Mutation {
            operation: Some(proto::mutation::Operation::Upsert(convert::entity_to_proto(
                &self.entity,
            ))),
            conflict_detection_strategy: None,
        }])
    }
}

/// Delete the entity with the given key. Requires a complete key.
///
/// Deleting a key that does not exist is not an error.
#[derive(Debug, Clone)]
pub struct Delete {
    key: Key,
}

impl Delete {
    pub fn new(key: Key) -> Self {
        Self { key }
    }
}

impl Mutations for Delete {
    fn into_mutations(self) -> Result<Vec<proto::Mutation>> {
        require_complete(&self.key, "delete")?;
        Ok(vec![proto::Mutation {
            operation: Some(proto::mutation::Operation::Delete(convert::key_to_proto(
                &self.key,
            ))),
            conflict_detection_strategy: None,
        }])
    }
}

#[derive(Debug, Clone)]
enum Op {
    Insert(Entity),
    Update(Entity),
    Upsert(Entity),
    Delete(Key),
}

/// An ordered collection of mutations committed atomically.
///
/// Mutation results come back in the same order the statements were added.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    ops: Vec<Op>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, entity: Entity) -> Self {
        self.ops.push(Op::Insert(entity));
        self
    }

    pub fn update(mut self, entity: Entity) -> Self {
        self.ops.push(Op::Update(entity));
        self
    }

    pub fn upsert(mut self, entity: Entity) -> Self {
        self.ops.push(Op::Upsert(entity));
        self
    }

    pub fn delete(mut self, key: Key) -> Self {
        self.ops.push(Op::Delete(key));
        self
    }

    /// Number of mutations in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Mutations for Batch {
    fn into_mutations(self) -> Result<Vec<proto::Mutation>> {
        let mut mutations = Vec::with_capacity(self.ops.len());
        for op in self.ops {
            let lowered = match op {
                Op::Insert(e) => Insert::new(e).into_mutations()?,
                Op::Update(e) => Update::new(e).into_mutations()?,
                Op::Upsert(e) => Upsert::new(e).into_mutations()?,
                Op::Delete(k) => Delete::new(k).into_mutations()?,
            };
            mutations.extend(lowered);
        }
        Ok(mutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_accepts_incomplete_key() {
        let entity = Entity::new(Key::incomplete("Task")).property("done", false);
        let mutations = Insert::new(entity).into_mutations().unwrap();
        assert_eq!(mutations.len(), 1);
        assert!(matches!(
            mutations[0].operation,
            Some(proto::mutation::Operation::Insert(_))
        ));
    }

    #[test]
    fn test_insert_rejects_keyless_entity() {
        let err = Insert::new(Entity::embedded()).into_mutations().unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_update_rejects_incomplete_key() {
        let entity = Entity::new(Key::incomplete("Task"));
        let err = Update::new(entity).into_mutations().unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_delete_rejects_incomplete_key() {
        let err = Delete::new(Key::incomplete("Task"))
            .into_mutations()
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_batch_preserves_statement_order() {
        let batch = Batch::new()
            .insert(Entity::new(Key::incomplete("Task")))
            .upsert(Entity::new(Key::with_id("Task", 1)))
            .delete(Key::with_id("Task", 2));
        assert_eq!(batch.len(), 3);

        let mutations = batch.into_mutations().unwrap();
        assert!(matches!(
            mutations[0].operation,
            Some(proto::mutation::Operation::Insert(_))
        ));
        assert!(matches!(
            mutations[1].operation,
            Some(proto::mutation::Operation::Upsert(_))
        ));
        assert!(matches!(
            mutations[2].operation,
            Some(proto::mutation::Operation::Delete(_))
        ));
    }

    #[test]
    fn test_batch_fails_on_first_invalid_statement() {
        let batch = Batch::new()
            .insert(Entity::new(Key::with_id("Task", 1)))
            .update(Entity::new(Key::incomplete("Task")));
        assert!(batch.into_mutations().is_err());
    }
}
