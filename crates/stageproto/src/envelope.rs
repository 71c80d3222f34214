//! Response envelope and typed errors for the bridge protocol.
//!
//! Every call returns an envelope: success carrying data, or a categorized
//! error. Batch calls that partially fail use the error envelope but still
//! carry the full summary as data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Response envelope - wraps results with protocol semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// Call succeeded; `data` is the typed response serialized to JSON
    Success { data: Value },

    /// Call failed. `data` is present when partial results exist (a batch
    /// summary with per-command failures).
    Error {
        error: BridgeError,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl ResponseEnvelope {
    /// Create a success envelope from any serializable response.
    pub fn success<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::Success { data },
            Err(e) => Self::Error {
                error: BridgeError::internal(format!("response serialization failed: {e}")),
                data: None,
            },
        }
    }

    /// Create an error envelope.
    pub fn error(error: BridgeError) -> Self {
        Self::Error { error, data: None }
    }

    /// Create an error envelope that still carries partial results.
    pub fn error_with_data<T: Serialize>(error: BridgeError, data: &T) -> Self {
        Self::Error {
            error,
            data: serde_json::to_value(data).ok(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Typed errors by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum BridgeError {
    /// Request shape is invalid: empty command list, size over limit,
    /// unrecognized run mode. Rejected before any work.
    #[error("{message}")]
    Validation {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Referenced resource (job id, tool) does not exist
    #[error("{resource_type} not found: {resource_id}")]
    NotFound {
        resource_type: String,
        resource_id: String,
    },

    /// Tool is known to the registry but currently disabled
    #[error("tool '{tool}' is disabled")]
    ToolDisabled { tool: String },

    /// A tool invocation threw or the batch contained failures
    #[error("{message}")]
    Invocation { message: String },

    /// A test run is already in progress. Distinguishable so callers can
    /// back off and poll instead of retrying blindly.
    #[error("a test run is already in progress (job {job_id})")]
    JobAlreadyRunning { job_id: String, retry_after_ms: u64 },

    /// Should not happen
    #[error("{message}")]
    Internal { message: String },
}

impl BridgeError {
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(
        code: impl Into<String>,
        message: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::Validation {
            code: code.into(),
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    pub fn tool_disabled(tool: impl Into<String>) -> Self {
        Self::ToolDisabled { tool: tool.into() }
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation {
            message: message.into(),
        }
    }

    pub fn already_running(job_id: impl Into<String>, retry_after_ms: u64) -> Self {
        Self::JobAlreadyRunning {
            job_id: job_id.into(),
            retry_after_ms,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Code for programmatic handling.
    pub fn code(&self) -> &str {
        match self {
            Self::Validation { code, .. } => code,
            Self::NotFound { .. } => "not_found",
            Self::ToolDisabled { .. } => "tool_disabled",
            Self::Invocation { .. } => "invocation_failed",
            Self::JobAlreadyRunning { .. } => "job_already_running",
            Self::Internal { .. } => "internal_error",
        }
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(e: anyhow::Error) -> Self {
        Self::internal(e.to_string())
    }
}
