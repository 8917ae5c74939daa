/// Transaction handles and read consistency options.
use bytes::Bytes;
use dstore_proto as proto;

/// An opaque handle to a server-side transaction.
///
/// Obtained from `Datastore::begin_transaction`; consumed by a transactional
/// commit or rollback. Cloning the handle does not clone the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: Bytes,
}

impl Transaction {
    pub(crate) fn new(id: Bytes) -> Self {
        Self { id }
    }

    /// The raw transaction identifier assigned by the service.
    pub fn id(&self) -> &Bytes {
        &self.id
    }

    pub(crate) fn into_id(self) -> Vec<u8> {
        self.id.to_vec()
    }
}

/// Options for beginning a transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    previous_transaction: Option<Bytes>,
    read_only: bool,
}

impl TransactionOptions {
    /// A read-write transaction. This is the default.
    pub fn read_write() -> Self {
        Self::default()
    }

    /// A read-write transaction retrying a previously aborted one.
    ///
    /// Passing the aborted transaction's handle lets the service prioritize
    /// the retry under contention.
    pub fn read_write_retrying(previous: Transaction) -> Self {
        Self {
            previous_transaction: Some(previous.id),
            read_only: false,
        }
    }

    /// A read-only transaction. Commits with mutations will be rejected.
    pub fn read_only() -> Self {
        Self {
            previous_transaction: None,
            read_only: true,
        }
    }

    pub(crate) fn into_proto(self) -> proto::TransactionOptions {
        use proto::transaction_options::{Mode, ReadOnly, ReadWrite};

        let mode = if self.read_only {
            Mode::ReadOnly(ReadOnly {})
        } else {
            Mode::ReadWrite(ReadWrite {
                previous_transaction: self
                    .previous_transaction
                    .map(|id| id.to_vec())
                    .unwrap_or_default(),
            })
        };
        proto::TransactionOptions { mode: Some(mode) }
    }
}

/// Read consistency for lookups and queries.
///
/// The service default is strong consistency for ancestor queries and
/// lookups, eventual for everything else.
#[derive(Debug, Clone, Default)]
pub enum ReadOptions {
    /// Let the service pick its default consistency.
    #[default]
    Default,
    /// Strongly consistent reads.
    Strong,
    /// Eventually consistent reads.
    Eventual,
    /// Read inside an open transaction.
    InTransaction(Transaction),
}

impl ReadOptions {
    pub(crate) fn into_proto(self) -> Option<proto::ReadOptions> {
        use proto::read_options::{ConsistencyType, ReadConsistency};

        let consistency_type = match self {
            ReadOptions::Default => return None,
            ReadOptions::Strong => {
                ConsistencyType::ReadConsistency(ReadConsistency::Strong as i32)
            }
            ReadOptions::Eventual => {
                ConsistencyType::ReadConsistency(ReadConsistency::Eventual as i32)
            }
            ReadOptions::InTransaction(tx) => ConsistencyType::Transaction(tx.into_id()),
        };
        Some(proto::ReadOptions {
            consistency_type: Some(consistency_type),
        })
    }
}
