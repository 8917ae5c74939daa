/// Error types for the dstore client
use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Internal service error: {0}")]
    InternalError(String),

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid response payload: {0}")]
    Decode(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Returns true if the failed call may succeed when retried.
    ///
    /// An aborted transaction is retryable by beginning a new transaction,
    /// not by replaying the same commit verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Unavailable(_)
                | ClientError::Timeout(_)
                | ClientError::TransactionAborted(_)
                | ClientError::ResourceExhausted(_)
        )
    }
}

/// Convert gRPC Status to ClientError
impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        let msg = status.message().to_string();

        match status.code() {
            tonic::Code::NotFound => ClientError::NotFound(msg),
            tonic::Code::InvalidArgument => ClientError::InvalidArgument(msg),
            tonic::Code::FailedPrecondition => ClientError::FailedPrecondition(msg),
            tonic::Code::Unavailable => ClientError::Unavailable(msg),
            tonic::Code::DeadlineExceeded => ClientError::Timeout(msg),
            tonic::Code::Internal => ClientError::InternalError(msg),
            tonic::Code::Aborted => ClientError::TransactionAborted(msg),
            tonic::Code::AlreadyExists => ClientError::AlreadyExists(msg),
            tonic::Code::ResourceExhausted => ClientError::ResourceExhausted(msg),
            tonic::Code::PermissionDenied => ClientError::PermissionDenied(msg),
            tonic::Code::Unauthenticated => ClientError::Unauthenticated(msg),
            _ => ClientError::Unknown(msg),
        }
    }
}

impl From<dstore_core::Error> for ClientError {
    fn from(err: dstore_core::Error) -> Self {
        ClientError::InvalidArgument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ClientError::from(Status::not_found("no entity"));
        assert!(matches!(err, ClientError::NotFound(_)));

        let err = ClientError::from(Status::aborted("too much contention"));
        assert!(matches!(err, ClientError::TransactionAborted(_)));
        assert!(err.is_retryable());

        let err = ClientError::from(Status::invalid_argument("bad key"));
        assert!(!err.is_retryable());
    }
}
