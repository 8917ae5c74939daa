//! Wire-format messages and client stub for the `google.datastore.v1` gRPC
//! API.
//!
//! The vendored schema lives under `proto/datastore.proto`. The prost/tonic
//! output is checked in at `src/gen/` so downstream builds do not need a
//! protoc toolchain; regenerate with `tonic-build` when the schema changes.

#![allow(clippy::large_enum_variant)]

include!("gen/google.datastore.v1.rs");

/// The fully-qualified name of the Datastore gRPC service.
pub const SERVICE_NAME: &str = "google.datastore.v1.Datastore";

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_key_roundtrips_through_wire_encoding() {
        let key = Key {
            partition_id: Some(PartitionId {
                project_id: "demo".to_string(),
                namespace_id: String::new(),
            }),
            path: vec![key::PathElement {
                kind: "Task".to_string(),
                id_type: Some(key::path_element::IdType::Name("t1".to_string())),
            }],
        };

        let bytes = key.encode_to_vec();
        let decoded = Key::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_value_oneof_encoding() {
        let value = Value {
            meaning: 0,
            exclude_from_indexes: true,
            value_type: Some(value::ValueType::IntegerValue(42)),
        };

        let bytes = value.encode_to_vec();
        let decoded = Value::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.value_type, Some(value::ValueType::IntegerValue(42)));
        assert!(decoded.exclude_from_indexes);
    }

    #[test]
    fn test_unset_limit_is_absent() {
        let query = Query::default();
        assert!(query.limit.is_none());
        // An all-default query encodes to nothing.
        assert!(query.encode_to_vec().is_empty());
    }
}
