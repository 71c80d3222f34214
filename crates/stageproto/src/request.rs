//! Request types for the bridge surface.
//!
//! These are the JSON shapes callers submit. Field names are snake_case on
//! the wire with camelCase aliases, since agent clients send both.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::TestFilter;

// ============================================================================
// Batch execution
// ============================================================================

/// One well-formed batch item: a tool name plus its parameter mapping.
///
/// The dispatcher accepts raw JSON entries so malformed items can be reported
/// per-command; this struct documents the expected shape and feeds schema
/// generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommandEntry {
    /// Name of the tool to invoke
    pub tool: String,
    /// Arbitrary nested parameters, normalized before invocation
    #[serde(default)]
    pub params: Value,
}

/// A batch of commands executed sequentially, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchRequest {
    /// Command entries, executed in list order. Raw JSON values so that a
    /// malformed entry fails alone instead of rejecting the whole request.
    pub commands: Vec<Value>,
    /// Stop between commands as soon as one fails
    #[serde(default, alias = "failFast")]
    pub fail_fast: bool,
    /// Accepted but not honored: commands always run sequentially because
    /// tool handlers mutate shared editor state
    #[serde(default)]
    pub parallel: bool,
    /// Parallelism hint, echoed back unused
    #[serde(default, alias = "maxParallelism")]
    pub max_parallelism: Option<u32>,
}

// ============================================================================
// Test-run jobs
// ============================================================================

/// Start a long-running test run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RunTestsRequest {
    /// Run mode: "EditMode" (default) or "PlayMode"
    pub mode: Option<String>,
    /// Force-clear a Running job before attempting the start
    #[serde(default, alias = "clearStuck")]
    pub clear_stuck: bool,
    /// Include per-test detail in the result payload
    #[serde(default, alias = "includeDetails")]
    pub include_details: bool,
    /// Include failed-test listings in the result payload
    #[serde(default, alias = "includeFailedTests")]
    pub include_failed_tests: bool,
    /// Run only these named tests
    #[serde(default, alias = "testNames")]
    pub test_names: Vec<String>,
    /// Run only these named groups
    #[serde(default, alias = "groupNames")]
    pub group_names: Vec<String>,
    /// Run only these categories
    #[serde(default, alias = "categoryNames")]
    pub category_names: Vec<String>,
    /// Run only these assemblies
    #[serde(default, alias = "assemblyNames")]
    pub assembly_names: Vec<String>,
}

impl RunTestsRequest {
    /// Collect the four optional name lists into a filter. All empty means
    /// run everything in the requested mode.
    pub fn filter(&self) -> TestFilter {
        TestFilter {
            test_names: self.test_names.clone(),
            group_names: self.group_names.clone(),
            category_names: self.category_names.clone(),
            assembly_names: self.assembly_names.clone(),
        }
    }
}

/// Poll a previously started job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PollJobRequest {
    /// Job ID returned by the start request
    pub job_id: String,
    /// Optional bounded wait for a terminal state, in milliseconds.
    /// Zero or absent returns the current status immediately.
    #[serde(default, alias = "waitTimeoutMs")]
    pub wait_timeout_ms: Option<u64>,
}
