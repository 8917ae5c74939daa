/// Type conversions between the core data model and the Datastore wire
/// format.
///
/// Model-to-wire is total; wire-to-model returns `ClientError::Decode` when
/// the service sends a payload the model cannot represent (missing oneof
/// fields, empty key paths). Due to Rust's orphan rules, conversions are
/// free functions instead of trait implementations.
use crate::error::{ClientError, Result};
use bytes::Bytes;
use dstore_core::{ElementId, Entity, Key, PathElement, Value, ValueKind};
use dstore_proto as proto;
use std::collections::HashMap;

// ============================================================================
// Value conversions
// ============================================================================

/// Convert a model value to a wire value.
///
/// Datastore rejects `exclude_from_indexes` on an array value itself, so an
/// unindexed array pushes the flag down onto each element and leaves the
/// array value's own flag clear.
pub fn value_to_proto(value: &Value) -> proto::Value {
    use proto::value::ValueType;

    if let ValueKind::Array(values) = value.kind() {
        let values = values
            .iter()
            .map(|v| {
                let mut pv = value_to_proto(v);
                if !value.indexed() {
                    pv.exclude_from_indexes = true;
                }
                pv
            })
            .collect();
        return proto::Value {
            meaning: 0,
            exclude_from_indexes: false,
            value_type: Some(ValueType::ArrayValue(proto::ArrayValue { values })),
        };
    }

    let value_type = match value.kind() {
        ValueKind::Null => ValueType::NullValue(proto::NullValue::NullValue as i32),
        ValueKind::Boolean(b) => ValueType::BooleanValue(*b),
        ValueKind::Integer(i) => ValueType::IntegerValue(*i),
        ValueKind::Double(d) => ValueType::DoubleValue(*d),
        ValueKind::Timestamp(micros) => ValueType::TimestampValue(micros_to_timestamp(*micros)),
        ValueKind::Key(key) => ValueType::KeyValue(key_to_proto(key)),
        ValueKind::String(s) => ValueType::StringValue(s.clone()),
        ValueKind::Blob(b) => ValueType::BlobValue(b.to_vec()),
        ValueKind::GeoPoint(gp) => ValueType::GeoPointValue(proto::LatLng {
            latitude: gp.latitude,
            longitude: gp.longitude,
        }),
        ValueKind::Entity(e) => ValueType::EntityValue(entity_to_proto(e)),
        // Handled by the early return above.
        ValueKind::Array(_) => ValueType::NullValue(proto::NullValue::NullValue as i32),
    };

    proto::Value {
        meaning: 0,
        exclude_from_indexes: !value.indexed(),
        value_type: Some(value_type),
    }
}

/// Convert a wire value to a model value.
pub fn proto_to_value(value: proto::Value) -> Result<Value> {
    use proto::value::ValueType;

    let excluded = value.exclude_from_indexes;
    let value_type = value
        .value_type
        .ok_or_else(|| ClientError::Decode("value has no value_type".to_string()))?;

    let kind = match value_type {
        ValueType::NullValue(_) => ValueKind::Null,
        ValueType::BooleanValue(b) => ValueKind::Boolean(b),
        ValueType::IntegerValue(i) => ValueKind::Integer(i),
        ValueType::DoubleValue(d) => ValueKind::Double(d),
        ValueType::TimestampValue(ts) => ValueKind::Timestamp(timestamp_to_micros(&ts)),
        ValueType::KeyValue(key) => ValueKind::Key(proto_to_key(key)?),
        ValueType::StringValue(s) => ValueKind::String(s),
        ValueType::BlobValue(b) => ValueKind::Blob(Bytes::from(b)),
        ValueType::GeoPointValue(ll) => ValueKind::GeoPoint(dstore_core::GeoPoint {
            latitude: ll.latitude,
            longitude: ll.longitude,
        }),
        ValueType::EntityValue(e) => ValueKind::Entity(proto_to_entity(e)?),
        ValueType::ArrayValue(arr) => ValueKind::Array(
            arr.values
                .into_iter()
                .map(proto_to_value)
                .collect::<Result<Vec<_>>>()?,
        ),
    };

    let value = Value::new(kind);
    Ok(if excluded { value.unindexed() } else { value })
}

/// Microseconds since epoch to a wire timestamp.
pub fn micros_to_timestamp(micros: i64) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: micros.div_euclid(1_000_000),
        nanos: (micros.rem_euclid(1_000_000) * 1_000) as i32,
    }
}

/// Wire timestamp to microseconds since epoch, truncating sub-microsecond
/// precision toward negative infinity.
pub fn timestamp_to_micros(ts: &prost_types::Timestamp) -> i64 {
    // Wire convention keeps nanos in [0, 1e9) regardless of the sign of
    // seconds, so this floors as required.
    ts.seconds * 1_000_000 + i64::from(ts.nanos) / 1_000
}

// ============================================================================
// Key conversions
// ============================================================================

/// Convert a model key to a wire key with no partition ID.
///
/// The service normalizes an absent partition to the request's project and
/// the default namespace.
pub fn key_to_proto(key: &Key) -> proto::Key {
    proto::Key {
        partition_id: None,
        path: key.path().iter().map(path_element_to_proto).collect(),
    }
}

/// Convert a model key to a wire key scoped to the given partition.
pub fn key_to_proto_in(key: &Key, partition: proto::PartitionId) -> proto::Key {
    proto::Key {
        partition_id: Some(partition),
        path: key.path().iter().map(path_element_to_proto).collect(),
    }
}

fn path_element_to_proto(el: &PathElement) -> proto::key::PathElement {
    use proto::key::path_element::IdType;

    proto::key::PathElement {
        kind: el.kind().to_string(),
        id_type: el.element_id().map(|id| match id {
            ElementId::Id(id) => IdType::Id(*id),
            ElementId::Name(name) => IdType::Name(name.clone()),
        }),
    }
}

/// Convert a wire key to a model key, dropping its partition ID.
///
/// Partition scoping is a request-level concern in this client; the model
/// key carries the ancestor path only.
pub fn proto_to_key(key: proto::Key) -> Result<Key> {
    use proto::key::path_element::IdType;

    let path = key
        .path
        .into_iter()
        .map(|el| match el.id_type {
            None => PathElement::incomplete(el.kind),
            Some(IdType::Id(id)) => PathElement::with_id(el.kind, id),
            Some(IdType::Name(name)) => PathElement::with_name(el.kind, name),
        })
        .collect();

    Key::from_path(path).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Build the wire partition ID for a project and optional namespace.
pub fn partition_id(project_id: &str, namespace: Option<&str>) -> proto::PartitionId {
    proto::PartitionId {
        project_id: project_id.to_string(),
        namespace_id: namespace.unwrap_or_default().to_string(),
    }
}

// ============================================================================
// Entity conversions
// ============================================================================

/// Convert a model entity to a wire entity.
pub fn entity_to_proto(entity: &Entity) -> proto::Entity {
    proto::Entity {
        key: entity.key().map(key_to_proto),
        properties: entity
            .properties()
            .iter()
            .map(|(name, value)| (name.clone(), value_to_proto(value)))
            .collect(),
    }
}

/// Convert a wire entity to a model entity.
pub fn proto_to_entity(entity: proto::Entity) -> Result<Entity> {
    let key = entity.key.map(proto_to_key).transpose()?;
    let mut properties = HashMap::new();
    for (name, value) in entity.properties {
        properties.insert(name, proto_to_value(value)?);
    }
    Ok(Entity::from_parts(key, properties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::value::ValueType;

    #[test]
    fn test_unindexed_scalar_sets_exclude_flag() {
        let pv = value_to_proto(&Value::from("secret").unindexed());
        assert!(pv.exclude_from_indexes);
        assert_eq!(pv.value_type, Some(ValueType::StringValue("secret".into())));
    }

    #[test]
    fn test_unindexed_array_pushes_flag_onto_elements() {
        let value = Value::from(vec![Value::from(1i64), Value::from(2i64)]).unindexed();
        let pv = value_to_proto(&value);

        // The array value itself must not carry the flag.
        assert!(!pv.exclude_from_indexes);
        let ValueType::ArrayValue(arr) = pv.value_type.unwrap() else {
            panic!("expected array value");
        };
        assert!(arr.values.iter().all(|v| v.exclude_from_indexes));
    }

    #[test]
    fn test_timestamp_micros_mapping() {
        let ts = micros_to_timestamp(1_500_000);
        assert_eq!(ts.seconds, 1);
        assert_eq!(ts.nanos, 500_000_000);
        assert_eq!(timestamp_to_micros(&ts), 1_500_000);

        // Before the epoch: nanos stay non-negative on the wire.
        let ts = micros_to_timestamp(-1);
        assert_eq!(ts.seconds, -1);
        assert_eq!(ts.nanos, 999_999_000);
        assert_eq!(timestamp_to_micros(&ts), -1);
    }

    #[test]
    fn test_key_roundtrip_preserves_path() {
        let key = Key::with_name("Org", "acme")
            .child(PathElement::with_id("User", 7))
            .unwrap();
        let decoded = proto_to_key(key_to_proto(&key)).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_empty_key_path_is_a_decode_error() {
        let err = proto_to_key(proto::Key::default()).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_value_without_payload_is_a_decode_error() {
        let err = proto_to_value(proto::Value::default()).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_nested_entity_roundtrip() {
        let entity = Entity::new(Key::with_id("User", 9))
            .property("name", "Ada")
            .property(
                "address",
                Entity::embedded().property("city", "Zurich"),
            )
            .property("scores", vec![Value::from(1i64), Value::from(2i64)]);

        let decoded = proto_to_entity(entity_to_proto(&entity)).unwrap();
        assert_eq!(decoded, entity);
    }

    #[test]
    fn test_partition_id() {
        let p = partition_id("demo", Some("staging"));
        assert_eq!(p.project_id, "demo");
        assert_eq!(p.namespace_id, "staging");

        let p = partition_id("demo", None);
        assert!(p.namespace_id.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::collection::{hash_map, vec};
        use proptest::prelude::*;

        fn arb_key() -> impl Strategy<Value = Key> {
            vec(
                (
                    "[A-Za-z]{1,6}",
                    prop_oneof![
                        any::<i64>().prop_map(ElementId::Id),
                        "[a-z0-9]{1,8}".prop_map(ElementId::Name),
                    ],
                ),
                1..4,
            )
            .prop_map(|elements| {
                let path = elements
                    .into_iter()
                    .map(|(kind, id)| match id {
                        ElementId::Id(id) => PathElement::with_id(kind, id),
                        ElementId::Name(name) => PathElement::with_name(kind, name),
                    })
                    .collect();
                Key::from_path(path).unwrap()
            })
        }

        fn arb_kind() -> impl Strategy<Value = ValueKind> {
            let scalar = prop_oneof![
                Just(ValueKind::Null),
                any::<bool>().prop_map(ValueKind::Boolean),
                any::<i64>().prop_map(ValueKind::Integer),
                any::<f64>()
                    .prop_filter("NaN never equals itself", |d| !d.is_nan())
                    .prop_map(ValueKind::Double),
                any::<i64>().prop_map(ValueKind::Timestamp),
                "[ -~]{0,12}".prop_map(ValueKind::String),
                vec(any::<u8>(), 0..16).prop_map(|b| ValueKind::Blob(Bytes::from(b))),
                (-90.0..90.0f64, -180.0..180.0f64).prop_map(|(latitude, longitude)| {
                    ValueKind::GeoPoint(dstore_core::GeoPoint {
                        latitude,
                        longitude,
                    })
                }),
                arb_key().prop_map(ValueKind::Key),
            ];
            scalar.prop_recursive(3, 24, 4, |inner| {
                let element = inner.prop_map(Value::new);
                prop_oneof![
                    vec(element.clone(), 0..4).prop_map(ValueKind::Array),
                    hash_map("[a-z]{1,6}", element, 0..4)
                        .prop_map(|props| ValueKind::Entity(Entity::from_parts(None, props))),
                ]
            })
        }

        fn arb_value() -> impl Strategy<Value = Value> {
            (arb_kind(), any::<bool>()).prop_map(|(kind, indexed)| {
                let value = Value::new(kind);
                // An unindexed array does not decode back bit-for-bit (the
                // flag moves onto the elements), so arrays stay indexed.
                if indexed || matches!(value.kind(), ValueKind::Array(_)) {
                    value
                } else {
                    value.unindexed()
                }
            })
        }

        proptest! {
            #[test]
            fn value_roundtrips_through_wire(value in arb_value()) {
                let decoded = proto_to_value(value_to_proto(&value)).unwrap();
                prop_assert_eq!(decoded, value);
            }

            #[test]
            fn entity_roundtrips_through_wire(
                key in arb_key(),
                props in hash_map("[a-z]{1,8}", arb_value(), 0..6),
            ) {
                let entity = Entity::from_parts(Some(key), props);
                let decoded = proto_to_entity(entity_to_proto(&entity)).unwrap();
                prop_assert_eq!(decoded, entity);
            }

            #[test]
            fn unindexed_array_flag_lands_on_every_element(
                values in vec(arb_value(), 0..5)
            ) {
                let wire = value_to_proto(&Value::from(values).unindexed());
                prop_assert!(!wire.exclude_from_indexes);
                match wire.value_type {
                    Some(ValueType::ArrayValue(arr)) => {
                        prop_assert!(
                            arr.values.iter().all(|v| v.exclude_from_indexes)
                        );
                    }
                    other => prop_assert!(false, "expected array value, got {other:?}"),
                }
            }
        }
    }
}
