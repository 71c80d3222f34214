//! Typed response types for the bridge surface.
//!
//! Tool invocations return a tagged `ToolOutcome` rather than a shape the
//! dispatcher has to sniff at runtime: success or failure is explicit in the
//! contract every tool must satisfy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{JobId, JobStatus, RunMode};

// ============================================================================
// Tool invocation contract
// ============================================================================

/// Outcome of a single tool invocation.
///
/// The one result contract for the tool-invocation boundary. A transport or
/// handler panic/throw is the `Err` side of the invoker's `Result`, not a
/// variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success {
        result: Value,
    },
    Failure {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
}

impl ToolOutcome {
    pub fn success(result: Value) -> Self {
        Self::Success { result }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            details: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Tool metadata exposed by the registry for discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

// ============================================================================
// Batch responses
// ============================================================================

/// Per-command outcome within a batch.
///
/// Exactly one of `result` / `error` is meaningful: `result` when `success`,
/// `error` otherwise. `tool` is None when the entry was malformed beyond
/// naming a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCommandResult {
    pub tool: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl BatchCommandResult {
    pub fn succeeded(tool: impl Into<String>, result: Value, duration_ms: u64) -> Self {
        Self {
            tool: Some(tool.into()),
            success: true,
            result: Some(result),
            error: None,
            duration_ms,
        }
    }

    pub fn failed(tool: Option<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool,
            success: false,
            result: None,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// Aggregate over one batch run. Built fresh per invocation, not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Per-command results, in submission order. Shorter than the request
    /// when fail-fast stopped the loop early.
    pub results: Vec<BatchCommandResult>,
    pub success_count: usize,
    pub failure_count: usize,
    /// True iff failure_count is zero
    pub overall_success: bool,
    pub parallel_requested: bool,
    /// Always false: commands run sequentially against shared editor state
    pub parallel_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallelism: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

// ============================================================================
// Job responses
// ============================================================================

/// Acknowledgement for an accepted test-run start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStartedResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub mode: RunMode,
    pub include_details: bool,
    pub include_failed_tests: bool,
}

/// Point-in-time view of the job slot, returned by polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    pub mode: RunMode,
    pub include_details: bool,
    pub include_failed_tests: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// Wall-clock duration, if the job has finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.created_at).num_milliseconds())
    }
}
