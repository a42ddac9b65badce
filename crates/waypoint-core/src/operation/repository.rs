//! Durable operation record port.
//!
//! Implemented by waypoint-infra (SQLite) and by `memory` for tests. Every
//! status change is a compare-and-swap on the current status so that a
//! transition computed from a stale read never lands.

use serde_json::Value;
use waypoint_types::error::RepositoryError;
use waypoint_types::operation::{Operation, OperationId, OperationStatus};

/// Repository trait for operation persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait OperationRepository: Send + Sync + 'static {
    /// Create a new operation in `IN_PROGRESS` and return it.
    fn create(
        &self,
        requester: &str,
    ) -> impl std::future::Future<Output = Result<Operation, RepositoryError>> + Send;

    fn get(
        &self,
        id: OperationId,
    ) -> impl std::future::Future<Output = Result<Option<Operation>, RepositoryError>> + Send;

    /// List operations newest first, optionally restricted to one requester.
    fn list(
        &self,
        requester: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<Operation>, RepositoryError>> + Send;

    /// Set status to `to` only if it is currently `from`.
    ///
    /// Returns `false` when the operation does not exist or is in another state.
    fn transition(
        &self,
        id: OperationId,
        from: OperationStatus,
        to: OperationStatus,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Commit a pause: `REQUESTING_PAUSE -> PAUSED` together with both payload
    /// locations and the running value. Returns `false` if not requesting a pause.
    fn record_pause(
        &self,
        id: OperationId,
        workflow_location: &str,
        result_location: &str,
        result: &Value,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// `PAUSED -> IN_PROGRESS`, clearing the pending workflow location.
    fn record_resume(
        &self,
        id: OperationId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Any state -> `COMPLETED` with the final result; clears the pending
    /// workflow location. Fails with `NotFound` for an unknown id.
    fn record_completion(
        &self,
        id: OperationId,
        result_location: &str,
        result: &Value,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
