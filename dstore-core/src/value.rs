use crate::entity::Entity;
use crate::key::Key;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// The typed payload of a property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    /// Microseconds since the Unix epoch (Datastore's stored precision).
    Timestamp(i64),
    Key(Key),
    String(String),
    Blob(Bytes),
    GeoPoint(GeoPoint),
    /// Embedded entity; its key is optional.
    Entity(Entity),
    Array(Vec<Value>),
}

/// A property value: a typed payload plus its indexed flag.
///
/// Values are indexed by default. An unindexed value is excluded from the
/// service's built-in indexes and cannot be filtered or ordered on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    kind: ValueKind,
    indexed: bool,
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            indexed: true,
        }
    }

    pub fn null() -> Self {
        Self::new(ValueKind::Null)
    }

    /// A timestamp value, in microseconds since the Unix epoch.
    pub fn timestamp(micros: i64) -> Self {
        Self::new(ValueKind::Timestamp(micros))
    }

    pub fn geo_point(latitude: f64, longitude: f64) -> Self {
        Self::new(ValueKind::GeoPoint(GeoPoint {
            latitude,
            longitude,
        }))
    }

    /// Exclude this value from the service's indexes.
    pub fn unindexed(mut self) -> Self {
        self.indexed = false;
        self
    }

    pub fn indexed(&self) -> bool {
        self.indexed
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn into_kind(self) -> ValueKind {
        self.kind
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Double(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Bytes> {
        match &self.kind {
            ValueKind::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&Key> {
        match &self.kind {
            ValueKind::Key(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_geo_point(&self) -> Option<GeoPoint> {
        match self.kind {
            ValueKind::GeoPoint(gp) => Some(gp),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match &self.kind {
            ValueKind::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::Array(values) => Some(values),
            _ => None,
        }
    }
}

impl From<ValueKind> for Value {
    fn from(kind: ValueKind) -> Self {
        Value::new(kind)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::new(ValueKind::Boolean(b))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::new(ValueKind::Integer(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::new(ValueKind::Integer(i as i64))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::new(ValueKind::Double(d))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::new(ValueKind::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::new(ValueKind::String(s))
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::new(ValueKind::Blob(b))
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        Value::new(ValueKind::Key(k))
    }
}

impl From<GeoPoint> for Value {
    fn from(gp: GeoPoint) -> Self {
        Value::new(ValueKind::GeoPoint(gp))
    }
}

impl From<Entity> for Value {
    fn from(e: Entity) -> Self {
        Value::new(ValueKind::Entity(e))
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::new(ValueKind::Array(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.as_integer(), None);

        let v = Value::from(42i64);
        assert_eq!(v.as_integer(), Some(42));

        let v = Value::from(2.5);
        assert_eq!(v.as_double(), Some(2.5));

        let v = Value::null();
        assert!(v.is_null());
    }

    #[test]
    fn test_indexed_flag() {
        let v = Value::from("hello");
        assert!(v.indexed());

        let v = v.unindexed();
        assert!(!v.indexed());
        // Payload is untouched.
        assert_eq!(v.as_str(), Some("hello"));
    }

    #[test]
    fn test_key_value() {
        let key = Key::with_name("Task", "t1");
        let v = Value::from(key.clone());
        assert_eq!(v.as_key(), Some(&key));
    }

    #[test]
    fn test_array_value() {
        let v = Value::from(vec![Value::from(1i64), Value::from("two")]);
        let values = v.as_array().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].as_integer(), Some(1));
        assert_eq!(values[1].as_str(), Some("two"));
    }

    #[test]
    fn test_geo_point() {
        let v = Value::geo_point(37.42, -122.08);
        let gp = v.as_geo_point().unwrap();
        assert_eq!(gp.latitude, 37.42);
        assert_eq!(gp.longitude, -122.08);
    }
}
