/// Decoded RPC results.
///
/// Thin wrappers over the wire responses that replace raw messages with the
/// core data model and turn sentinel values into typed enums.
use crate::convert;
use crate::error::{ClientError, Result};
use bytes::Bytes;
use dstore_core::{Entity, Key};
use dstore_proto as proto;

/// The state of a query after a result batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoreResults {
    /// Additional batches remain; rerun from the end cursor to continue.
    NotFinished,
    /// The request limit was hit; more results may exist past it.
    MoreResultsAfterLimit,
    /// The request end cursor was hit; more results may exist past it.
    MoreResultsAfterCursor,
    /// The query is exhausted.
    NoMoreResults,
}

impl MoreResults {
    fn from_proto(raw: i32) -> Result<Self> {
        use proto::query_result_batch::MoreResultsType;

        match MoreResultsType::try_from(raw) {
            Ok(MoreResultsType::NotFinished) => Ok(MoreResults::NotFinished),
            Ok(MoreResultsType::MoreResultsAfterLimit) => Ok(MoreResults::MoreResultsAfterLimit),
            Ok(MoreResultsType::MoreResultsAfterCursor) => {
                Ok(MoreResults::MoreResultsAfterCursor)
            }
            Ok(MoreResultsType::NoMoreResults) => Ok(MoreResults::NoMoreResults),
            Ok(MoreResultsType::Unspecified) | Err(_) => Err(ClientError::Decode(format!(
                "unrecognized more_results state: {raw}"
            ))),
        }
    }

    /// Whether rerunning the query from the end cursor can yield more
    /// results.
    pub fn may_have_more(&self) -> bool {
        !matches!(self, MoreResults::NoMoreResults)
    }
}

/// One batch of entity query results.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub entities: Vec<Entity>,
    /// Cursor pointing after the last result; feed it to
    /// `Query::start_cursor` to fetch the next batch.
    pub end_cursor: Bytes,
    pub more_results: MoreResults,
    /// Results skipped because of an offset.
    pub skipped_results: i32,
    /// Version of the snapshot the batch was read from.
    pub snapshot_version: i64,
}

fn batch_of(response: proto::RunQueryResponse) -> Result<proto::QueryResultBatch> {
    response
        .batch
        .ok_or_else(|| ClientError::Decode("query response has no batch".to_string()))
}

impl QueryResult {
    pub(crate) fn from_proto(response: proto::RunQueryResponse) -> Result<Self> {
        let batch = batch_of(response)?;
        let entities = batch
            .entity_results
            .into_iter()
            .map(|er| {
                let entity = er
                    .entity
                    .ok_or_else(|| ClientError::Decode("result has no entity".to_string()))?;
                convert::proto_to_entity(entity)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            entities,
            end_cursor: Bytes::from(batch.end_cursor),
            more_results: MoreResults::from_proto(batch.more_results)?,
            skipped_results: batch.skipped_results,
            snapshot_version: batch.snapshot_version,
        })
    }
}

/// One batch of keys-only query results.
#[derive(Debug, Clone)]
pub struct KeyQueryResult {
    pub keys: Vec<Key>,
    pub end_cursor: Bytes,
    pub more_results: MoreResults,
    pub skipped_results: i32,
}

impl KeyQueryResult {
    pub(crate) fn from_proto(response: proto::RunQueryResponse) -> Result<Self> {
        let batch = batch_of(response)?;
        let keys = batch
            .entity_results
            .into_iter()
            .map(|er| {
                let key = er
                    .entity
                    .and_then(|e| e.key)
                    .ok_or_else(|| ClientError::Decode("result has no key".to_string()))?;
                convert::proto_to_key(key)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            keys,
            end_cursor: Bytes::from(batch.end_cursor),
            more_results: MoreResults::from_proto(batch.more_results)?,
            skipped_results: batch.skipped_results,
        })
    }
}

/// The outcome of a lookup.
///
/// Orderings of the three lists are service-defined and unrelated to the
/// order of the requested keys.
#[derive(Debug, Clone)]
pub struct LookupResult {
    /// Entities that exist.
    pub found: Vec<Entity>,
    /// Keys that were looked up but do not exist.
    pub missing: Vec<Key>,
    /// Keys the service declined to look up in this call; retry these.
    pub deferred: Vec<Key>,
}

impl LookupResult {
    pub(crate) fn from_proto(response: proto::LookupResponse) -> Result<Self> {
        let found = response
            .found
            .into_iter()
            .map(|er| {
                let entity = er
                    .entity
                    .ok_or_else(|| ClientError::Decode("result has no entity".to_string()))?;
                convert::proto_to_entity(entity)
            })
            .collect::<Result<Vec<_>>>()?;

        let missing = response
            .missing
            .into_iter()
            .map(|er| {
                let key = er
                    .entity
                    .and_then(|e| e.key)
                    .ok_or_else(|| ClientError::Decode("result has no key".to_string()))?;
                convert::proto_to_key(key)
            })
            .collect::<Result<Vec<_>>>()?;

        let deferred = response
            .deferred
            .into_iter()
            .map(convert::proto_to_key)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            found,
            missing,
            deferred,
        })
    }
}

/// The outcome of a single mutation within a commit.
#[derive(Debug, Clone)]
pub struct MutationResult {
    /// The key the service allocated, set only when the mutation wrote an
    /// entity with an incomplete key.
    pub key: Option<Key>,
    /// Entity version after the mutation.
    pub version: i64,
    pub conflict_detected: bool,
}

impl MutationResult {
    pub(crate) fn from_proto(result: proto::MutationResult) -> Result<Self> {
        Ok(Self {
            key: result.key.map(convert::proto_to_key).transpose()?,
            version: result.version,
            conflict_detected: result.conflict_detected,
        })
    }
}

/// The outcome of a commit.
#[derive(Debug, Clone)]
pub struct CommitResult {
    /// One result per mutation, in mutation order.
    pub mutation_results: Vec<MutationResult>,
    pub index_updates: i32,
}

impl CommitResult {
    pub(crate) fn from_proto(response: proto::CommitResponse) -> Result<Self> {
        Ok(Self {
            mutation_results: response
                .mutation_results
                .into_iter()
                .map(MutationResult::from_proto)
                .collect::<Result<Vec<_>>>()?,
            index_updates: response.index_updates,
        })
    }
}

/// The outcome of an ID allocation: the input keys completed with allocated
/// IDs, in input order.
#[derive(Debug, Clone)]
pub struct AllocateIdsResult {
    pub keys: Vec<Key>,
}

impl AllocateIdsResult {
    pub(crate) fn from_proto(response: proto::AllocateIdsResponse) -> Result<Self> {
        Ok(Self {
            keys: response
                .keys
                .into_iter()
                .map(convert::proto_to_key)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_result(kind: &str, id: i64) -> proto::EntityResult {
        proto::EntityResult {
            entity: Some(proto::Entity {
                key: Some(proto::Key {
                    partition_id: None,
                    path: vec![proto::key::PathElement {
                        kind: kind.to_string(),
                        id_type: Some(proto::key::path_element::IdType::Id(id)),
                    }],
                }),
                properties: Default::default(),
            }),
            version: 1,
            cursor: vec![],
        }
    }

    #[test]
    fn test_query_result_decodes_batch() {
        let response = proto::RunQueryResponse {
            batch: Some(proto::QueryResultBatch {
                skipped_results: 2,
                skipped_cursor: vec![],
                entity_result_type: proto::entity_result::ResultType::Full as i32,
                entity_results: vec![entity_result("Task", 1), entity_result("Task", 2)],
                end_cursor: b"cur".to_vec(),
                more_results: proto::query_result_batch::MoreResultsType::NoMoreResults as i32,
                snapshot_version: 99,
            }),
            query: None,
        };

        let result = QueryResult::from_proto(response).unwrap();
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.end_cursor, Bytes::from_static(b"cur"));
        assert_eq!(result.more_results, MoreResults::NoMoreResults);
        assert!(!result.more_results.may_have_more());
        assert_eq!(result.skipped_results, 2);
        assert_eq!(result.snapshot_version, 99);
    }

    #[test]
    fn test_missing_batch_is_a_decode_error() {
        let err = QueryResult::from_proto(proto::RunQueryResponse::default()).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_unspecified_more_results_is_a_decode_error() {
        let response = proto::RunQueryResponse {
            batch: Some(proto::QueryResultBatch::default()),
            query: None,
        };
        let err = QueryResult::from_proto(response).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_key_query_result_extracts_keys() {
        let response = proto::RunQueryResponse {
            batch: Some(proto::QueryResultBatch {
                entity_results: vec![entity_result("Task", 7)],
                more_results: proto::query_result_batch::MoreResultsType::NotFinished as i32,
                ..Default::default()
            }),
            query: None,
        };

        let result = KeyQueryResult::from_proto(response).unwrap();
        assert_eq!(result.keys, vec![Key::with_id("Task", 7)]);
        assert!(result.more_results.may_have_more());
    }

    #[test]
    fn test_lookup_result_splits_found_missing_deferred() {
        let response = proto::LookupResponse {
            found: vec![entity_result("Task", 1)],
            missing: vec![entity_result("Task", 2)],
            deferred: vec![proto::Key {
                partition_id: None,
                path: vec![proto::key::PathElement {
                    kind: "Task".to_string(),
                    id_type: Some(proto::key::path_element::IdType::Id(3)),
                }],
            }],
        };

        let result = LookupResult::from_proto(response).unwrap();
        assert_eq!(result.found.len(), 1);
        assert_eq!(result.missing, vec![Key::with_id("Task", 2)]);
        assert_eq!(result.deferred, vec![Key::with_id("Task", 3)]);
    }

    #[test]
    fn test_commit_result_preserves_mutation_order() {
        let response = proto::CommitResponse {
            mutation_results: vec![
                proto::MutationResult {
                    key: None,
                    version: 5,
                    conflict_detected: false,
                },
                proto::MutationResult {
                    key: Some(proto::Key {
                        partition_id: None,
                        path: vec![proto::key::PathElement {
                            kind: "Task".to_string(),
                            id_type: Some(proto::key::path_element::IdType::Id(42)),
                        }],
                    }),
                    version: 6,
                    conflict_detected: false,
                },
            ],
            index_updates: 4,
        };

        let result = CommitResult::from_proto(response).unwrap();
        assert_eq!(result.mutation_results.len(), 2);
        assert_eq!(result.mutation_results[0].version, 5);
        assert_eq!(
            result.mutation_results[1].key,
            Some(Key::with_id("Task", 42))
        );
        assert_eq!(result.index_updates, 4);
    }
}
