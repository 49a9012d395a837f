//! Error types for the connector

use thiserror::Error;

use crate::client::ClientError;
use crate::model::ModelError;

/// Errors that can occur while saving or loading models
#[derive(Error, Debug)]
pub enum MappingError {
    /// Exactly one of user and password was given
    #[error("Invalid user/password pair")]
    InvalidCredentials,

    /// The store rejected an element
    #[error("Error with element: {element}")]
    Element {
        element: String,
        #[source]
        source: ClientError,
    },

    /// The store rejected a relationship
    #[error("Error with reference: {source_id} - {reference} - {target_id}")]
    Relationship {
        source_id: String,
        reference: String,
        target_id: String,
        #[source]
        source: ClientError,
    },

    /// Every regenerated identity collided with an existing node
    #[error("No free identity for {element} after {attempts} attempts")]
    IdentityExhausted { element: String, attempts: u32 },

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type MappingResult<T> = Result<T, MappingError>;
