//! JSON payload files for paused and completed operations.
//!
//! Layout: `{data_dir}/operations/{id}/workflow.json` holds the serialized
//! remaining chain, `result.json` the running value or final result. The
//! returned location is the file path. Writes go to a sibling temp file
//! which is then renamed over the target, so a reader never sees a
//! half-written payload.

use std::path::{Path, PathBuf};

use serde_json::Value;
use waypoint_core::operation::PayloadStore;
use waypoint_types::error::RepositoryError;
use waypoint_types::operation::OperationId;

use super::operations_dir;

const WORKFLOW_FILE: &str = "workflow.json";
const RESULT_FILE: &str = "result.json";

/// Filesystem implementation of `PayloadStore`.
pub struct LocalPayloadStore {
    root: PathBuf,
}

impl LocalPayloadStore {
    /// Store payloads under `{data_dir}/operations/`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: operations_dir(data_dir),
        }
    }

    /// Directory for one operation's payloads.
    pub fn operation_dir(&self, id: OperationId) -> PathBuf {
        self.root.join(id.0.to_string())
    }

    async fn write_json(&self, path: PathBuf, value: &Value) -> Result<String, RepositoryError> {
        let content = serde_json::to_vec_pretty(value)
            .map_err(|e| RepositoryError::Storage(format!("serialize payload: {e}")))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::Storage(format!("{}: {e}", parent.display())))?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &content)
            .await
            .map_err(|e| RepositoryError::Storage(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| RepositoryError::Storage(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "wrote payload");
        Ok(path.display().to_string())
    }
}

impl PayloadStore for LocalPayloadStore {
    async fn save_workflow(
        &self,
        id: OperationId,
        workflow: &Value,
    ) -> Result<String, RepositoryError> {
        self.write_json(self.operation_dir(id).join(WORKFLOW_FILE), workflow)
            .await
    }

    async fn save_result(&self, id: OperationId, result: &Value) -> Result<String, RepositoryError> {
        self.write_json(self.operation_dir(id).join(RESULT_FILE), result)
            .await
    }

    async fn load(&self, location: &str) -> Result<Value, RepositoryError> {
        let content = match tokio::fs::read(location).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::NotFound);
            }
            Err(e) => return Err(RepositoryError::Storage(format!("{location}: {e}"))),
        };

        serde_json::from_slice(&content)
            .map_err(|e| RepositoryError::Storage(format!("corrupt payload {location}: {e}")))
    }
}
