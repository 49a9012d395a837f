//! Error types for the store clients

use crate::graph::GraphError;
use thiserror::Error;

/// Errors that can occur when talking to a graph store
#[derive(Error, Debug)]
pub enum ClientError {
    /// A uniqueness constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Query parsing or execution error reported by the store
    #[error("Query error: {0}")]
    QueryError(String),

    /// Connection error (remote mode)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The response did not have the expected shape
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The client was closed
    #[error("Client is closed")]
    Closed,

    /// In-memory store error (embedded mode)
    #[error("Store error: {0}")]
    StoreError(GraphError),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, ClientError::ConstraintViolation(_))
    }
}

impl From<GraphError> for ClientError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::UniqueViolation { .. } => ClientError::ConstraintViolation(err.to_string()),
            other => ClientError::StoreError(other),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_constraint_violation() {
        let err: ClientError = GraphError::UniqueViolation {
            label: "M".into(),
            key: "uid".into(),
            value: "\"1\"".into(),
        }
        .into();
        assert!(err.is_constraint_violation());

        let err: ClientError = GraphError::MissingProperty { label: "M".into(), key: "uid".into() }.into();
        assert!(!err.is_constraint_violation());
    }
}
