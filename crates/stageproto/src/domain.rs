//! Domain types for test-run jobs.
//!
//! Newtypes and closed enums shared between the bridge core and its callers.
//! String forms are lowercase on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// JobId - Newtype for type safety
// ============================================================================

/// Unique identifier for a test-run job.
///
/// A thin wrapper for ergonomics; on the wire it is just a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// JobStatus
// ============================================================================

/// State of the single test-run slot.
///
/// `Running` is the only non-terminal state. `Cleared` is reached only via an
/// explicit clear-stuck request while Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cleared,
}

impl JobStatus {
    /// True for Completed, Failed, and Cleared.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    /// Lowercase string for JSON/serde compatibility.
    pub fn to_string_lower(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cleared => "cleared",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_lower(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cleared" => Some(JobStatus::Cleared),
            _ => None,
        }
    }
}

// ============================================================================
// RunMode
// ============================================================================

/// Test run mode. Closed set; unknown strings are a validation error at the
/// request boundary, not a fault in the job manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    EditMode,
    PlayMode,
}

impl RunMode {
    /// Parse a caller-supplied mode string. `None` when unrecognized.
    ///
    /// Accepts `EditMode`/`editmode`/`edit_mode` style casings since clients
    /// are case-inconsistent.
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "").as_str() {
            "editmode" | "edit" => Some(RunMode::EditMode),
            "playmode" | "play" => Some(RunMode::PlayMode),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::EditMode => "EditMode",
            RunMode::PlayMode => "PlayMode",
        }
    }
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::EditMode
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TestFilter
// ============================================================================

/// Filter criteria for a test run. All lists empty means no filtering: run
/// everything in the requested mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFilter {
    #[serde(default)]
    pub test_names: Vec<String>,
    #[serde(default)]
    pub group_names: Vec<String>,
    #[serde(default)]
    pub category_names: Vec<String>,
    #[serde(default)]
    pub assembly_names: Vec<String>,
}

impl TestFilter {
    pub fn is_empty(&self) -> bool {
        self.test_names.is_empty()
            && self.group_names.is_empty()
            && self.category_names.is_empty()
            && self.assembly_names.is_empty()
    }
}
