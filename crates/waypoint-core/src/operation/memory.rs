//! In-memory adapters for the operation ports.
//!
//! Used by the engine tests and usable for embedding without a database.
//! Neither adapter ever suspends, so a status change is visible to every
//! reader as soon as the call returns.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use waypoint_types::error::RepositoryError;
use waypoint_types::operation::{Operation, OperationId, OperationStatus};

use super::payload::PayloadStore;
use super::repository::OperationRepository;

// ---------------------------------------------------------------------------
// InMemoryOperationRepository
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct InMemoryOperationRepository {
    next_id: AtomicI64,
    records: DashMap<OperationId, Operation>,
}

impl Default for InMemoryOperationRepository {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            records: DashMap::new(),
        }
    }
}

impl InMemoryOperationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `update` if the record exists and `guard` accepts its status.
    fn update_if(
        &self,
        id: OperationId,
        guard: impl FnOnce(OperationStatus) -> bool,
        update: impl FnOnce(&mut Operation),
    ) -> bool {
        match self.records.get_mut(&id) {
            Some(mut record) if guard(record.status) => {
                update(&mut record);
                record.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }
}

impl OperationRepository for InMemoryOperationRepository {
    async fn create(&self, requester: &str) -> Result<Operation, RepositoryError> {
        let id = OperationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let operation = Operation {
            id,
            requester: requester.to_string(),
            status: OperationStatus::InProgress,
            pending_workflow_location: None,
            pending_result_location: None,
            result: None,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(id, operation.clone());
        Ok(operation)
    }

    async fn get(&self, id: OperationId) -> Result<Option<Operation>, RepositoryError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn list(&self, requester: Option<&str>) -> Result<Vec<Operation>, RepositoryError> {
        let mut operations: Vec<Operation> = self
            .records
            .iter()
            .filter(|r| requester.is_none_or(|req| r.requester == req))
            .map(|r| r.value().clone())
            .collect();
        operations.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(operations)
    }

    async fn transition(
        &self,
        id: OperationId,
        from: OperationStatus,
        to: OperationStatus,
    ) -> Result<bool, RepositoryError> {
        Ok(self.update_if(id, |s| s == from, |r| r.status = to))
    }

    async fn record_pause(
        &self,
        id: OperationId,
        workflow_location: &str,
        result_location: &str,
        result: &Value,
    ) -> Result<bool, RepositoryError> {
        Ok(self.update_if(
            id,
            |s| s == OperationStatus::RequestingPause,
            |r| {
                r.status = OperationStatus::Paused;
                r.pending_workflow_location = Some(workflow_location.to_string());
                r.pending_result_location = Some(result_location.to_string());
                r.result = Some(result.clone());
            },
        ))
    }

    async fn record_resume(&self, id: OperationId) -> Result<bool, RepositoryError> {
        Ok(self.update_if(
            id,
            |s| s == OperationStatus::Paused,
            |r| {
                r.status = OperationStatus::InProgress;
                r.pending_workflow_location = None;
            },
        ))
    }

    async fn record_completion(
        &self,
        id: OperationId,
        result_location: &str,
        result: &Value,
    ) -> Result<(), RepositoryError> {
        let updated = self.update_if(
            id,
            |_| true,
            |r| {
                r.status = OperationStatus::Completed;
                r.pending_workflow_location = None;
                r.pending_result_location = Some(result_location.to_string());
                r.result = Some(result.clone());
            },
        );
        if updated {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

// ---------------------------------------------------------------------------
// InMemoryPayloadStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryPayloadStore {
    payloads: DashMap<String, Value>,
}

impl InMemoryPayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a stored payload in place. Tests use this to simulate
    /// corruption between a pause and a resume.
    pub fn replace(&self, location: &str, value: Value) {
        self.payloads.insert(location.to_string(), value);
    }

    pub fn remove(&self, location: &str) {
        self.payloads.remove(location);
    }

    fn store(&self, location: String, value: &Value) -> String {
        self.payloads.insert(location.clone(), value.clone());
        location
    }
}

impl PayloadStore for InMemoryPayloadStore {
    async fn save_workflow(&self, id: OperationId, workflow: &Value) -> Result<String, RepositoryError> {
        Ok(self.store(format!("memory://{id}/workflow.json"), workflow))
    }

    async fn save_result(&self, id: OperationId, result: &Value) -> Result<String, RepositoryError> {
        Ok(self.store(format!("memory://{id}/result.json"), result))
    }

    async fn load(&self, location: &str) -> Result<Value, RepositoryError> {
        self.payloads
            .get(location)
            .map(|v| v.value().clone())
            .ok_or(RepositoryError::NotFound)
    }
}
