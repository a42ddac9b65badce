use thiserror::Error;

/// Errors from repository and payload-store operations (used by trait
/// definitions in waypoint-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload storage error: {0}")]
    Storage(String),
}

/// An externally supplied operation id could not be decoded.
#[derive(Debug, Error)]
#[error("invalid operation id '{0}'")]
pub struct OperationIdError(pub String);
