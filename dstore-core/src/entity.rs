use crate::key::Key;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A record: an optional key plus a mapping of property name to typed value.
///
/// Entities embedded inside a [`Value`] carry no key; top-level entities sent
/// in mutations always do. Properties accumulate through the consuming
/// `property` builder before serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    key: Option<Key>,
    properties: HashMap<String, Value>,
}

impl Entity {
    /// Create an entity addressed by `key`.
    pub fn new(key: Key) -> Self {
        Self {
            key: Some(key),
            properties: HashMap::new(),
        }
    }

    /// Create a keyless entity, for embedding inside a value.
    pub fn embedded() -> Self {
        Self {
            key: None,
            properties: HashMap::new(),
        }
    }

    /// Rebuild an entity from its parts (used by the wire conversion layer).
    pub fn from_parts(key: Option<Key>, properties: HashMap<String, Value>) -> Self {
        Self { key, properties }
    }

    /// Set a property, replacing any previous value under the same name.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Replace the entity's key, e.g. with one completed by the service.
    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    pub fn into_parts(self) -> (Option<Key>, HashMap<String, Value>) {
        (self.key, self.properties)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// String property shorthand.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Integer property shorthand.
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_integer)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_builder() {
        let entity = Entity::new(Key::with_name("Task", "t1"))
            .property("done", false)
            .property("priority", 4i64)
            .property("description", "write docs");

        assert_eq!(entity.key().unwrap().name(), Some("t1"));
        assert_eq!(entity.len(), 3);
        assert_eq!(entity.string("description"), Some("write docs"));
        assert_eq!(entity.integer("priority"), Some(4));
        assert_eq!(entity.get("done").unwrap().as_boolean(), Some(false));
        assert!(entity.get("missing").is_none());
    }

    #[test]
    fn test_property_replaces() {
        let entity = Entity::new(Key::with_id("Task", 1))
            .property("n", 1i64)
            .property("n", 2i64);
        assert_eq!(entity.integer("n"), Some(2));
        assert_eq!(entity.len(), 1);
    }

    #[test]
    fn test_embedded_entity() {
        let address = Entity::embedded()
            .property("city", "Zurich")
            .property("zip", "8001");
        assert!(address.key().is_none());

        let user = Entity::new(Key::with_id("User", 9)).property("address", address);
        let embedded = user.get("address").unwrap().as_entity().unwrap();
        assert_eq!(embedded.string("city"), Some("Zurich"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let entity = Entity::new(
            Key::with_name("Org", "acme")
                .child(crate::PathElement::with_id("User", 7))
                .unwrap(),
        )
        .property("name", "Ada")
        .property("active", true)
        .property("scores", vec![Value::from(1i64), Value::from(2i64)]);

        let json = serde_json::to_string(&entity).unwrap();
        let decoded: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, entity);
    }
}
