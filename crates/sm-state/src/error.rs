//! Error types for sm-state

use thiserror::Error;

/// Errors that can occur while reading service-management state
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// A row could not be mapped onto its record type
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Snapshot import/parse error
    #[error("Snapshot load failed: {0}")]
    Snapshot(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),

    /// The backing store refused to serve reads
    #[error("State store unavailable: {0}")]
    Unavailable(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Deserialization(err.to_string())
    }
}
