use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Identifier of a single path element: numeric id or string name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementId {
    Id(i64),
    Name(String),
}

/// One (kind, id|name) step of an ancestor path.
///
/// An element without an id or name is *incomplete*; only the final element
/// of a key path may be incomplete (the service assigns the id at insert).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathElement {
    kind: String,
    id: Option<ElementId>,
}

impl PathElement {
    /// Create an incomplete element (kind only).
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// Create an element addressed by numeric id.
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id: Some(ElementId::Id(id)),
        }
    }

    /// Create an element addressed by name.
    pub fn with_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(ElementId::Name(name.into())),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> Option<i64> {
        match self.id {
            Some(ElementId::Id(id)) => Some(id),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.id {
            Some(ElementId::Name(name)) => Some(name),
            _ => None,
        }
    }

    pub fn element_id(&self) -> Option<&ElementId> {
        self.id.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.id.is_some()
    }
}

/// Hierarchical entity identifier: an ancestor path of (kind, id|name) pairs.
///
/// Keys are immutable; `child` and `parent` produce new keys. The final
/// element addresses the entity itself, preceding elements are its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawKey")]
pub struct Key {
    path: Vec<PathElement>,
}

/// Mirror of [`Key`] for deserialization; conversion goes through
/// `from_path`, so decoded keys satisfy the same path invariants as
/// constructed ones.
#[derive(Deserialize)]
struct RawKey {
    path: Vec<PathElement>,
}

impl TryFrom<RawKey> for Key {
    type Error = Error;

    fn try_from(raw: RawKey) -> Result<Self> {
        Key::from_path(raw.path)
    }
}

impl Key {
    /// A single-element key with no id or name (completed by the service).
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            path: vec![PathElement::incomplete(kind)],
        }
    }

    /// A single-element key addressed by numeric id.
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            path: vec![PathElement::with_id(kind, id)],
        }
    }

    /// A single-element key addressed by name.
    pub fn with_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: vec![PathElement::with_name(kind, name)],
        }
    }

    /// Build a key from a full ancestor path.
    ///
    /// The path must be non-empty and only its final element may be
    /// incomplete.
    pub fn from_path(path: Vec<PathElement>) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidKey("key path is empty".to_string()));
        }
        if let Some(el) = path[..path.len() - 1].iter().find(|el| !el.is_complete()) {
            return Err(Error::InvalidKey(format!(
                "ancestor element '{}' has no id or name",
                el.kind()
            )));
        }
        Ok(Self { path })
    }

    /// Append a child element, using this key as the ancestor path.
    ///
    /// Fails if this key is incomplete: an incomplete element cannot be an
    /// ancestor.
    pub fn child(mut self, element: PathElement) -> Result<Self> {
        if !self.is_complete() {
            return Err(Error::InvalidKey(format!(
                "cannot extend incomplete key of kind '{}'",
                self.kind()
            )));
        }
        self.path.push(element);
        Ok(self)
    }

    /// The key addressing this key's parent, if it has ancestors.
    pub fn parent(&self) -> Option<Key> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Key {
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    /// The full ancestor path, leaf element last.
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// Kind of the final (leaf) element.
    pub fn kind(&self) -> &str {
        self.leaf().kind()
    }

    /// Numeric id of the final element, if it has one.
    pub fn id(&self) -> Option<i64> {
        self.leaf().id()
    }

    /// Name of the final element, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.leaf().name()
    }

    /// True when every element of the path has an id or name.
    pub fn is_complete(&self) -> bool {
        // Construction guarantees completeness of all but the leaf.
        self.leaf().is_complete()
    }

    fn leaf(&self) -> &PathElement {
        self.path.last().expect("key path is never empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_element_keys() {
        let key = Key::with_name("Task", "t1");
        assert_eq!(key.kind(), "Task");
        assert_eq!(key.name(), Some("t1"));
        assert_eq!(key.id(), None);
        assert!(key.is_complete());
        assert!(key.parent().is_none());

        let key = Key::with_id("Task", 42);
        assert_eq!(key.id(), Some(42));
        assert_eq!(key.name(), None);

        let key = Key::incomplete("Task");
        assert!(!key.is_complete());
    }

    #[test]
    fn test_child_and_parent() {
        let org = Key::with_name("Org", "acme");
        let user = org
            .clone()
            .child(PathElement::with_id("User", 7))
            .unwrap();

        assert_eq!(user.path().len(), 2);
        assert_eq!(user.kind(), "User");
        assert_eq!(user.id(), Some(7));
        assert_eq!(user.parent(), Some(org));
    }

    #[test]
    fn test_child_of_incomplete_key_fails() {
        let err = Key::incomplete("Org")
            .child(PathElement::with_id("User", 1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn test_from_path_validation() {
        assert!(Key::from_path(vec![]).is_err());

        let bad = vec![
            PathElement::incomplete("Org"),
            PathElement::with_id("User", 1),
        ];
        assert!(Key::from_path(bad).is_err());

        let ok = vec![
            PathElement::with_name("Org", "acme"),
            PathElement::incomplete("User"),
        ];
        let key = Key::from_path(ok).unwrap();
        assert!(!key.is_complete());
        assert_eq!(key.kind(), "User");
    }

    #[test]
    fn test_deserialize_enforces_path_invariants() {
        // An empty path must not produce a key.
        assert!(serde_json::from_str::<Key>(r#"{"path":[]}"#).is_err());

        // Neither may an incomplete ancestor element.
        let bad = r#"{"path":[
            {"kind":"Org","id":null},
            {"kind":"User","id":{"Id":1}}
        ]}"#;
        assert!(serde_json::from_str::<Key>(bad).is_err());

        let good = r#"{"path":[{"kind":"Task","id":{"Name":"t1"}}]}"#;
        let key: Key = serde_json::from_str(good).unwrap();
        assert_eq!(key, Key::with_name("Task", "t1"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_element() -> impl Strategy<Value = PathElement> {
            prop_oneof![
                "[A-Za-z]{1,8}".prop_map(PathElement::incomplete),
                ("[A-Za-z]{1,8}", any::<i64>())
                    .prop_map(|(kind, id)| PathElement::with_id(kind, id)),
                ("[A-Za-z]{1,8}", "[a-z0-9-]{1,12}")
                    .prop_map(|(kind, name)| PathElement::with_name(kind, name)),
            ]
        }

        proptest! {
            #[test]
            fn from_path_accepts_exactly_paths_with_complete_ancestors(
                path in proptest::collection::vec(arb_element(), 1..6)
            ) {
                let ancestors_complete =
                    path[..path.len() - 1].iter().all(PathElement::is_complete);
                let result = Key::from_path(path.clone());
                prop_assert_eq!(result.is_ok(), ancestors_complete);
                if let Ok(key) = result {
                    prop_assert_eq!(key.path(), path.as_slice());
                    prop_assert_eq!(key.is_complete(),
                        path.last().unwrap().is_complete());
                }
            }

            #[test]
            fn parent_of_child_is_identity(
                base in proptest::collection::vec(arb_element(), 1..4),
                leaf in arb_element(),
            ) {
                prop_assume!(base.iter().all(PathElement::is_complete));
                let key = Key::from_path(base).unwrap();
                let child = key.clone().child(leaf).unwrap();
                prop_assert_eq!(child.parent(), Some(key));
            }
        }
    }
}
