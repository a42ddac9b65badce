//! Operation domain types.
//!
//! An operation is one client-visible unit of long-running, pausable work.
//! Its durable record is the single source of truth for status; the engine
//! re-reads it at every checkpoint instead of holding an in-memory copy.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OperationIdError;

// ---------------------------------------------------------------------------
// OperationId
// ---------------------------------------------------------------------------

/// Integer identifier of an operation, assigned by the durable record.
///
/// Internally the raw integer is used; externally the id is only ever
/// exposed through [`OperationId::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub i64);

impl OperationId {
    /// Encode the id for external use (base64 of the decimal text).
    pub fn encode(&self) -> String {
        STANDARD.encode(self.0.to_string())
    }

    /// Decode an externally supplied id produced by [`OperationId::encode`].
    pub fn decode(encoded: &str) -> Result<Self, OperationIdError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| OperationIdError(encoded.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|_| OperationIdError(encoded.to_string()))?;
        text.parse::<i64>()
            .map(OperationId)
            .map_err(|_| OperationIdError(encoded.to_string()))
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OperationStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an operation.
///
/// ```text
/// IN_PROGRESS -> REQUESTING_PAUSE -> PAUSED -> IN_PROGRESS (resume)
///                                          -> CANCELLED
/// IN_PROGRESS -> COMPLETED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    InProgress,
    RequestingPause,
    Paused,
    Completed,
    Cancelled,
}

impl OperationStatus {
    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::InProgress => "IN_PROGRESS",
            OperationStatus::RequestingPause => "REQUESTING_PAUSE",
            OperationStatus::Paused => "PAUSED",
            OperationStatus::Completed => "COMPLETED",
            OperationStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(OperationStatus::InProgress),
            "REQUESTING_PAUSE" => Ok(OperationStatus::RequestingPause),
            "PAUSED" => Ok(OperationStatus::Paused),
            "COMPLETED" => Ok(OperationStatus::Completed),
            "CANCELLED" => Ok(OperationStatus::Cancelled),
            other => Err(format!("invalid operation status: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation (durable record)
// ---------------------------------------------------------------------------

/// The durable record of one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    /// Opaque owning principal, used for attribution and listing only.
    pub requester: String,
    pub status: OperationStatus,
    /// Location of the persisted remaining chain. Present only while paused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_workflow_location: Option<String>,
    /// Location of the running value at the last checkpoint, or of the final
    /// result once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_result_location: Option<String>,
    /// Inline copy of the value stored at `pending_result_location`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ControlOutcome
// ---------------------------------------------------------------------------

/// Response shape of the operation control surface (pause/resume/cancel).
///
/// Invalid transitions are reported here rather than as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlOutcome {
    /// Encoded operation id as supplied by (or returned to) the caller.
    pub operation_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ControlOutcome {
    pub fn accepted(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            success: true,
            message: None,
        }
    }

    pub fn rejected(operation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            success: false,
            message: Some(message.into()),
        }
    }
}
