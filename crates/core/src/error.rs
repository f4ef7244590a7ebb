//! Error types for the reconciliation engine
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::types::{RecordId, TypeName};
use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the reconciliation engine
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed relationship metadata, rejected at schema-registration time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Store write or read failure; the in-flight snapshot is discarded
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// A relationship references a record type unknown to the schema.
    /// Fatal for that relationship only; siblings still save.
    #[error("Schema mismatch: relationship {field:?} on {type_name:?} targets an unregistered type")]
    SchemaMismatch {
        /// Owning record type
        type_name: TypeName,
        /// Relationship field name
        field: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation on a record id the registry has never seen
    #[error("Unknown record: {0:?}")]
    UnknownRecord(RecordId),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
