//! Payload storage port for persisted chains and running values.

use serde_json::Value;
use waypoint_types::error::RepositoryError;
use waypoint_types::operation::OperationId;

/// Stores JSON payloads and hands back an opaque location string that is
/// recorded on the operation.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// The filesystem implementation lives in waypoint-infra.
pub trait PayloadStore: Send + Sync + 'static {
    /// Persist the serialized remaining chain of `id`. Overwrites.
    fn save_workflow(
        &self,
        id: OperationId,
        workflow: &Value,
    ) -> impl std::future::Future<Output = Result<String, RepositoryError>> + Send;

    /// Persist the running value (or final result) of `id`. Overwrites.
    fn save_result(
        &self,
        id: OperationId,
        result: &Value,
    ) -> impl std::future::Future<Output = Result<String, RepositoryError>> + Send;

    /// Load a payload by location.
    ///
    /// A missing payload is `NotFound`; unreadable or corrupt content is
    /// `Storage`.
    fn load(
        &self,
        location: &str,
    ) -> impl std::future::Future<Output = Result<Value, RepositoryError>> + Send;
}
