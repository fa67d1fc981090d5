use thiserror::Error;

use crate::domain::{FieldType, OptionPath};

pub type FormResult<T> = Result<T, FormError>;

/// Error type that captures form-editing, serialization, and backend failures.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Field index {index} out of range (form has {len} fields)")]
    FieldIndexOutOfRange { index: usize, len: usize },
    #[error("Field not found: {0}")]
    FieldNotFound(String),
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Path `{path}` does not resolve: {reason}")]
    InvalidPath { path: OptionPath, reason: String },
    #[error("Node at `{0}` cannot hold children")]
    NotAContainer(OptionPath),
    #[error("Node at `{0}` is not a package")]
    NotAPackage(OptionPath),
    #[error("Group at `{0}` still has child options; remove them before marking it as a package")]
    PackageHasChildren(OptionPath),
    #[error("Key-value pair {index} out of range (package has {len} pairs)")]
    PairIndexOutOfRange { index: usize, len: usize },
    #[error("Key `{0}` already exists in this package")]
    DuplicateKey(String),
    #[error("Field type `{0}` does not support this operation")]
    UnsupportedForType(FieldType),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("A submission is already in progress")]
    SubmitInFlight,
    #[error("Request cancelled")]
    Cancelled,
    #[error("Form `{0}` not found")]
    FormNotFound(String),
    #[error("Malformed payload: {0}")]
    Payload(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
