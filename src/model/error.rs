//! Error types for the object model

use thiserror::Error;

/// Errors raised while building or mutating models
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Class {class} has no attribute {attribute}")]
    UnknownAttribute { class: String, attribute: String },

    #[error("Class {class} has no reference {reference}")]
    UnknownReference { class: String, reference: String },

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Type mismatch for {name}: expected {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Unknown element key: {0}")]
    UnknownKey(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;
