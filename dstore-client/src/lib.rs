/// Datastore gRPC Client Library
///
/// This crate provides a fluent Rust client for the Google Cloud Datastore
/// v1 gRPC API: typed keys and entities, query and mutation builders, and a
/// thin connection façade over the generated stub.

pub mod client;
pub mod convert;
pub mod error;
pub mod mutation;
pub mod query;
pub mod results;
pub mod transaction;

// Re-export key types
pub use client::Datastore;
pub use dstore_core::{ElementId, Entity, GeoPoint, Key, PathElement, Value, ValueKind};
pub use error::{ClientError, Result};
pub use mutation::{Batch, Delete, Insert, Mutations, Update, Upsert};
pub use query::{Filter, KeyQuery, Order, Query};
pub use results::{
    AllocateIdsResult, CommitResult, KeyQueryResult, LookupResult, MoreResults, MutationResult,
    QueryResult,
};
pub use transaction::{ReadOptions, Transaction, TransactionOptions};
