//! SQLite operation repository implementation.
//!
//! Implements `OperationRepository` from `waypoint-core` using sqlx with split
//! read/write pools. Every status change is an `UPDATE ... WHERE status = ?`
//! and reports whether a row was affected, so transitions computed from a
//! stale read never land.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use waypoint_core::operation::OperationRepository;
use waypoint_types::error::RepositoryError;
use waypoint_types::operation::{Operation, OperationId, OperationStatus};

use super::pool::DatabasePool;

const COLUMNS: &str = "id, requester, status, pending_workflow_location, pending_result_location, result, created_at, updated_at";

/// SQLite-backed implementation of `OperationRepository`.
pub struct SqliteOperationRepository {
    pool: DatabasePool,
}

impl SqliteOperationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct OperationRow {
    id: i64,
    requester: String,
    status: String,
    pending_workflow_location: Option<String>,
    pending_result_location: Option<String>,
    result: Option<String>,
    created_at: String,
    updated_at: String,
}

impl OperationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            requester: row.try_get("requester")?,
            status: row.try_get("status")?,
            pending_workflow_location: row.try_get("pending_workflow_location")?,
            pending_result_location: row.try_get("pending_result_location")?,
            result: row.try_get("result")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_operation(self) -> Result<Operation, RepositoryError> {
        let status: OperationStatus = self
            .status
            .parse()
            .map_err(RepositoryError::Query)?;
        let result = self
            .result
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid result JSON: {e}")))
            })
            .transpose()?;

        Ok(Operation {
            id: OperationId(self.id),
            requester: self.requester,
            status,
            pending_workflow_location: self.pending_workflow_location,
            pending_result_location: self.pending_result_location,
            result,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn to_json(value: &Value) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(format!("serialize result: {e}")))
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// OperationRepository impl
// ---------------------------------------------------------------------------

impl OperationRepository for SqliteOperationRepository {
    async fn create(&self, requester: &str) -> Result<Operation, RepositoryError> {
        let now = Utc::now();
        let done = sqlx::query(
            "INSERT INTO operations (requester, status, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(requester)
        .bind(OperationStatus::InProgress.as_str())
        .bind(format_datetime(&now))
        .bind(format_datetime(&now))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        let id = OperationId(done.last_insert_rowid());
        tracing::debug!(operation_id = %id, requester, "created operation record");
        Ok(Operation {
            id,
            requester: requester.to_string(),
            status: OperationStatus::InProgress,
            pending_workflow_location: None,
            pending_result_location: None,
            result: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: OperationId) -> Result<Option<Operation>, RepositoryError> {
        // Status is polled at every checkpoint; read through the writer so a
        // just-committed transition is always visible.
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM operations WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => {
                let r = OperationRow::from_row(&row).map_err(query_err)?;
                Ok(Some(r.into_operation()?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, requester: Option<&str>) -> Result<Vec<Operation>, RepositoryError> {
        let rows = match requester {
            Some(requester) => {
                sqlx::query(&format!(
                    "SELECT {COLUMNS} FROM operations WHERE requester = ? ORDER BY id DESC"
                ))
                .bind(requester)
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(&format!("SELECT {COLUMNS} FROM operations ORDER BY id DESC"))
                    .fetch_all(&self.pool.reader)
                    .await
            }
        }
        .map_err(query_err)?;

        let mut operations = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = OperationRow::from_row(row).map_err(query_err)?;
            operations.push(r.into_operation()?);
        }
        Ok(operations)
    }

    async fn transition(
        &self,
        id: OperationId,
        from: OperationStatus,
        to: OperationStatus,
    ) -> Result<bool, RepositoryError> {
        let done = sqlx::query(
            "UPDATE operations SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(format_datetime(&Utc::now()))
        .bind(id.0)
        .bind(from.as_str())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(done.rows_affected() > 0)
    }

    async fn record_pause(
        &self,
        id: OperationId,
        workflow_location: &str,
        result_location: &str,
        result: &Value,
    ) -> Result<bool, RepositoryError> {
        let done = sqlx::query(
            r#"UPDATE operations SET
                 status = ?,
                 pending_workflow_location = ?,
                 pending_result_location = ?,
                 result = ?,
                 updated_at = ?
               WHERE id = ? AND status = ?"#,
        )
        .bind(OperationStatus::Paused.as_str())
        .bind(workflow_location)
        .bind(result_location)
        .bind(to_json(result)?)
        .bind(format_datetime(&Utc::now()))
        .bind(id.0)
        .bind(OperationStatus::RequestingPause.as_str())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(done.rows_affected() > 0)
    }

    async fn record_resume(&self, id: OperationId) -> Result<bool, RepositoryError> {
        let done = sqlx::query(
            r#"UPDATE operations SET
                 status = ?,
                 pending_workflow_location = NULL,
                 updated_at = ?
               WHERE id = ? AND status = ?"#,
        )
        .bind(OperationStatus::InProgress.as_str())
        .bind(format_datetime(&Utc::now()))
        .bind(id.0)
        .bind(OperationStatus::Paused.as_str())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(done.rows_affected() > 0)
    }

    async fn record_completion(
        &self,
        id: OperationId,
        result_location: &str,
        result: &Value,
    ) -> Result<(), RepositoryError> {
        let done = sqlx::query(
            r#"UPDATE operations SET
                 status = ?,
                 pending_workflow_location = NULL,
                 pending_result_location = ?,
                 result = ?,
                 updated_at = ?
               WHERE id = ?"#,
        )
        .bind(OperationStatus::Completed.as_str())
        .bind(result_location)
        .bind(to_json(result)?)
        .bind(format_datetime(&Utc::now()))
        .bind(id.0)
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if done.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
