/// The Datastore gRPC client façade.
use crate::convert;
use crate::error::{ClientError, Result};
use crate::mutation::{Delete, Insert, Mutations, Update, Upsert};
use crate::query::{KeyQuery, Query};
use crate::results::{
    AllocateIdsResult, CommitResult, KeyQueryResult, LookupResult, MutationResult, QueryResult,
};
use crate::transaction::{ReadOptions, Transaction, TransactionOptions};
use bytes::Bytes;
use dstore_core::{Entity, Key};
use dstore_proto as proto;
use dstore_proto::datastore_client::DatastoreClient;
use tonic::transport::Channel;
use tracing::debug;

/// A client for one project (and optionally one namespace) of the Datastore
/// service.
///
/// Wraps the generated gRPC stub with the core data model: keys and entities
/// go in, decoded results come out. Cloning is cheap and clones share the
/// underlying HTTP/2 connection.
///
/// # Example
///
/// ```no_run
/// use dstore_client::{Datastore, Entity, Key};
///
/// # async fn run() -> dstore_client::Result<()> {
/// let mut db = Datastore::connect("http://localhost:8081", "demo-project").await?;
/// let task = Entity::new(Key::incomplete("Task")).property("done", false);
/// let result = db.insert(task).await?;
/// println!("assigned key: {:?}", result.key);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Datastore {
    inner: DatastoreClient<Channel>,
    project_id: String,
    namespace: Option<String>,
}

impl Datastore {
    /// Connect to a Datastore endpoint for the given project.
    pub async fn connect(endpoint: impl Into<String>, project_id: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        debug!(service = proto::SERVICE_NAME, %endpoint, "connecting");
        let client = DatastoreClient::connect(endpoint.clone())
            .await
            .map_err(|e| ClientError::ConnectionError(format!("{endpoint}: {e}")))?;

        Ok(Self {
            inner: client,
            project_id: project_id.into(),
            namespace: None,
        })
    }

    /// Build a client over an already-established channel.
    ///
    /// Use this to apply channel-level settings (TLS, timeouts, interceptors)
    /// before handing the connection over.
    pub fn from_channel(channel: Channel, project_id: impl Into<String>) -> Self {
        Self {
            inner: DatastoreClient::new(channel),
            project_id: project_id.into(),
            namespace: None,
        }
    }

    /// Scope all requests to a namespace. Queries may override this
    /// per-query.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// The project this client operates on.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn partition(&self, namespace_override: Option<&str>) -> proto::PartitionId {
        convert::partition_id(
            &self.project_id,
            namespace_override.or(self.namespace.as_deref()),
        )
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Look up entities by key with default read consistency.
    pub async fn lookup(&mut self, keys: Vec<Key>) -> Result<LookupResult> {
        self.lookup_with_options(keys, ReadOptions::Default).await
    }

    /// Look up entities by key.
    pub async fn lookup_with_options(
        &mut self,
        keys: Vec<Key>,
        options: ReadOptions,
    ) -> Result<LookupResult> {
        for key in &keys {
            if !key.is_complete() {
                return Err(ClientError::InvalidArgument(
                    "lookup requires complete keys".to_string(),
                ));
            }
        }
        debug!(project_id = %self.project_id, keys = keys.len(), "lookup");

        let partition = self.partition(None);
        let request = proto::LookupRequest {
            project_id: self.project_id.clone(),
            read_options: options.into_proto(),
            keys: keys
                .iter()
                .map(|k| convert::key_to_proto_in(k, partition.clone()))
                .collect(),
        };

        let response = self.inner.lookup(request).await?;
        LookupResult::from_proto(response.into_inner())
    }

    /// Fetch a single entity, or `None` if it does not exist.
    ///
    /// A key the service defers under resource pressure is looked up again
    /// until it resolves, so `None` always means the entity is absent.
    pub async fn get(&mut self, key: Key) -> Result<Option<Entity>> {
        loop {
            let result = self.lookup(vec![key.clone()]).await?;
            match single_lookup_outcome(result) {
                GetOutcome::Found(entity) => return Ok(Some(entity)),
                GetOutcome::Missing => return Ok(None),
                GetOutcome::Deferred => continue,
            }
        }
    }

    /// Run an entity query with default read consistency.
    pub async fn run_query(&mut self, query: Query) -> Result<QueryResult> {
        self.run_query_with_options(query, ReadOptions::Default).await
    }

    /// Run an entity query.
    pub async fn run_query_with_options(
        &mut self,
        query: Query,
        options: ReadOptions,
    ) -> Result<QueryResult> {
        debug!(project_id = %self.project_id, "run_query");
        let partition = self.partition(query.namespace_override());
        let response = self
            .inner
            .run_query(proto::RunQueryRequest {
                project_id: self.project_id.clone(),
                partition_id: Some(partition),
                read_options: options.into_proto(),
                query_type: Some(proto::run_query_request::QueryType::Query(
                    query.into_proto(),
                )),
            })
            .await?;
        QueryResult::from_proto(response.into_inner())
    }

    /// Run a keys-only query with default read consistency.
    pub async fn run_key_query(&mut self, query: KeyQuery) -> Result<KeyQueryResult> {
        self.run_key_query_with_options(query, ReadOptions::Default)
            .await
    }

    /// Run a keys-only query.
    pub async fn run_key_query_with_options(
        &mut self,
        query: KeyQuery,
        options: ReadOptions,
    ) -> Result<KeyQueryResult> {
        debug!(project_id = %self.project_id, "run_key_query");
        let partition = self.partition(query.namespace_override());
        let response = self
            .inner
            .run_query(proto::RunQueryRequest {
                project_id: self.project_id.clone(),
                partition_id: Some(partition),
                read_options: options.into_proto(),
                query_type: Some(proto::run_query_request::QueryType::Query(
                    query.into_proto(),
                )),
            })
            .await?;
        KeyQueryResult::from_proto(response.into_inner())
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Begin a read-write transaction.
    pub async fn begin_transaction(&mut self) -> Result<Transaction> {
        self.begin_transaction_with_options(TransactionOptions::read_write())
            .await
    }

    /// Begin a transaction.
    pub async fn begin_transaction_with_options(
        &mut self,
        options: TransactionOptions,
    ) -> Result<Transaction> {
        debug!(project_id = %self.project_id, "begin_transaction");
        let response = self
            .inner
            .begin_transaction(proto::BeginTransactionRequest {
                project_id: self.project_id.clone(),
                transaction_options: Some(options.into_proto()),
            })
            .await?;
        Ok(Transaction::new(Bytes::from(
            response.into_inner().transaction,
        )))
    }

    /// Commit mutations outside a transaction.
    ///
    /// Each mutation applies independently; a failure may leave a prefix of
    /// the batch applied.
    pub async fn commit(&mut self, mutations: impl Mutations) -> Result<CommitResult> {
        self.commit_inner(
            mutations.into_mutations()?,
            proto::commit_request::Mode::NonTransactional,
            None,
        )
        .await
    }

    /// Commit mutations atomically inside a transaction, consuming it.
    pub async fn commit_in_transaction(
        &mut self,
        mutations: impl Mutations,
        transaction: Transaction,
    ) -> Result<CommitResult> {
        self.commit_inner(
            mutations.into_mutations()?,
            proto::commit_request::Mode::Transactional,
            Some(transaction),
        )
        .await
    }

    async fn commit_inner(
        &mut self,
        mutations: Vec<proto::Mutation>,
        mode: proto::commit_request::Mode,
        transaction: Option<Transaction>,
    ) -> Result<CommitResult> {
        debug!(
            project_id = %self.project_id,
            mutations = mutations.len(),
            transactional = transaction.is_some(),
            "commit"
        );
        let response = self
            .inner
            .commit(proto::CommitRequest {
                project_id: self.project_id.clone(),
                mode: mode as i32,
                mutations,
                transaction_selector: transaction.map(|tx| {
                    proto::commit_request::TransactionSelector::Transaction(tx.into_id())
                }),
            })
            .await?;
        CommitResult::from_proto(response.into_inner())
    }

    /// Roll back a transaction, consuming it.
    pub async fn rollback(&mut self, transaction: Transaction) -> Result<()> {
        debug!(project_id = %self.project_id, "rollback");
        self.inner
            .rollback(proto::RollbackRequest {
                project_id: self.project_id.clone(),
                transaction: transaction.into_id(),
            })
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // ID allocation
    // ------------------------------------------------------------------

    /// Allocate IDs for incomplete keys ahead of an insert.
    pub async fn allocate_ids(&mut self, keys: Vec<Key>) -> Result<AllocateIdsResult> {
        for key in &keys {
            if key.is_complete() {
                return Err(ClientError::InvalidArgument(
                    "allocate_ids requires incomplete keys".to_string(),
                ));
            }
        }
        debug!(project_id = %self.project_id, keys = keys.len(), "allocate_ids");

        let partition = self.partition(None);
        let response = self
            .inner
            .allocate_ids(proto::AllocateIdsRequest {
                project_id: self.project_id.clone(),
                keys: keys
                    .iter()
                    .map(|k| convert::key_to_proto_in(k, partition.clone()))
                    .collect(),
            })
            .await?;
        AllocateIdsResult::from_proto(response.into_inner())
    }

    /// Prevent the numeric IDs of the given complete keys from being
    /// auto-allocated.
    pub async fn reserve_ids(&mut self, keys: Vec<Key>) -> Result<()> {
        for key in &keys {
            if !key.is_complete() {
                return Err(ClientError::InvalidArgument(
                    "reserve_ids requires complete keys".to_string(),
                ));
            }
        }
        debug!(project_id = %self.project_id, keys = keys.len(), "reserve_ids");

        let partition = self.partition(None);
        self.inner
            .reserve_ids(proto::ReserveIdsRequest {
                project_id: self.project_id.clone(),
                database_id: String::new(),
                keys: keys
                    .iter()
                    .map(|k| convert::key_to_proto_in(k, partition.clone()))
                    .collect(),
            })
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Single-mutation conveniences
    // ------------------------------------------------------------------

    async fn commit_one(&mut self, mutations: impl Mutations) -> Result<MutationResult> {
        let mut result = self.commit(mutations).await?;
        if result.mutation_results.is_empty() {
            return Err(ClientError::Decode(
                "commit returned no mutation results".to_string(),
            ));
        }
        Ok(result.mutation_results.remove(0))
    }

    /// Insert a single entity that must not already exist.
    pub async fn insert(&mut self, entity: Entity) -> Result<MutationResult> {
        self.commit_one(Insert::new(entity)).await
    }

    /// Update a single entity that must already exist.
    pub async fn update(&mut self, entity: Entity) -> Result<MutationResult> {
        self.commit_one(Update::new(entity)).await
    }

    /// Write a single entity whether or not it exists.
    pub async fn upsert(&mut self, entity: Entity) -> Result<MutationResult> {
        self.commit_one(Upsert::new(entity)).await
    }

    /// Delete a single entity by key.
    pub async fn delete(&mut self, key: Key) -> Result<MutationResult> {
        self.commit_one(Delete::new(key)).await
    }
}

enum GetOutcome {
    Found(Entity),
    Missing,
    Deferred,
}

/// Classify a single-key lookup: a deferred key is neither found nor
/// missing and must be requested again.
fn single_lookup_outcome(mut result: LookupResult) -> GetOutcome {
    if let Some(entity) = result.found.pop() {
        GetOutcome::Found(entity)
    } else if result.deferred.is_empty() {
        GetOutcome::Missing
    } else {
        GetOutcome::Deferred
    }
}
