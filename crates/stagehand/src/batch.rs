//! Batch command dispatch.
//!
//! Executes a list of command entries strictly sequentially, awaiting each
//! tool invocation before starting the next, so every command observes the
//! side effects of all prior commands in the same batch. Per-command failures
//! are isolated: a failed entry produces a failure result and (unless
//! fail-fast) the loop continues. The whole request is rejected up front only
//! for shape errors - empty list or size over the configured ceiling.
//!
//! `parallel` is accepted but never honored: tool handlers mutate shared
//! editor state on one execution context, so the dispatcher warns and runs
//! sequentially.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use stageproto::{
    BatchCommandResult, BatchRequest, BatchSummary, BridgeError, ResponseEnvelope, ToolOutcome,
};

use crate::config::BridgeConfig;
use crate::normalize::Normalizer;
use crate::registry::{ToolInvoker, ToolRegistry};

const ERR_NOT_AN_OBJECT: &str = "command entry is not an object";
const ERR_MISSING_TOOL: &str = "command entry is missing a tool name";

/// Sequential batch executor over the tool-invocation boundary.
pub struct BatchDispatcher {
    registry: Arc<dyn ToolRegistry>,
    invoker: Arc<dyn ToolInvoker>,
    normalizer: Normalizer,
    config: BridgeConfig,
}

impl BatchDispatcher {
    pub fn new(
        registry: Arc<dyn ToolRegistry>,
        invoker: Arc<dyn ToolInvoker>,
        normalizer: Normalizer,
        config: BridgeConfig,
    ) -> Self {
        Self {
            registry,
            invoker,
            normalizer,
            config,
        }
    }

    /// Execute a batch and wrap the summary in the caller-visible envelope:
    /// success iff every processed command succeeded, error otherwise - the
    /// error envelope still carries the full summary as data.
    pub async fn execute(&self, request: BatchRequest) -> ResponseEnvelope {
        match self.run(request).await {
            Ok(summary) if summary.overall_success => ResponseEnvelope::success(&summary),
            Ok(summary) => ResponseEnvelope::error_with_data(
                BridgeError::invocation(format!(
                    "{} of {} commands failed",
                    summary.failure_count,
                    summary.results.len()
                )),
                &summary,
            ),
            Err(error) => ResponseEnvelope::error(error),
        }
    }

    /// Execute a batch, producing the summary. Shape errors reject the whole
    /// request with no work performed.
    pub async fn run(&self, request: BatchRequest) -> Result<BatchSummary, BridgeError> {
        if request.commands.is_empty() {
            return Err(BridgeError::validation_field(
                "empty_batch",
                "batch request contains no commands",
                "commands",
            ));
        }

        let max = self.config.max_commands_per_batch();
        if request.commands.len() > max {
            return Err(BridgeError::validation_field(
                "batch_too_large",
                format!(
                    "batch of {} commands exceeds the limit of {}",
                    request.commands.len(),
                    max
                ),
                "commands",
            ));
        }

        let mut warnings = Vec::new();
        if request.parallel {
            warn!(
                max_parallelism = ?request.max_parallelism,
                "parallel execution requested but not applied; commands run sequentially"
            );
            warnings.push(
                "parallel execution is not applied; commands run sequentially in submission order"
                    .to_string(),
            );
        }

        info!(
            commands = request.commands.len(),
            fail_fast = request.fail_fast,
            "executing batch"
        );

        let mut results = Vec::with_capacity(request.commands.len());
        for (index, entry) in request.commands.iter().enumerate() {
            let result = self.execute_entry(entry).await;
            let failed = !result.success;
            results.push(result);

            if failed && request.fail_fast {
                warn!(index, "fail-fast: stopping batch after failed command");
                break;
            }
        }

        let success_count = results.iter().filter(|r| r.success).count();
        let failure_count = results.len() - success_count;

        Ok(BatchSummary {
            success_count,
            failure_count,
            overall_success: failure_count == 0,
            parallel_requested: request.parallel,
            parallel_applied: false,
            max_parallelism: request.max_parallelism,
            warnings,
            results,
        })
    }

    /// Run one entry in isolation. Never returns an error: every failure
    /// mode becomes a failure result for this entry alone.
    async fn execute_entry(&self, entry: &Value) -> BatchCommandResult {
        let started = Instant::now();
        let elapsed = |s: Instant| s.elapsed().as_millis() as u64;

        let object = match entry.as_object() {
            Some(o) => o,
            None => return BatchCommandResult::failed(None, ERR_NOT_AN_OBJECT, elapsed(started)),
        };

        let tool = object
            .get("tool")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let tool = match tool {
            Some(t) => t.to_string(),
            None => return BatchCommandResult::failed(None, ERR_MISSING_TOOL, elapsed(started)),
        };

        let params = object
            .get("params")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        let params = self.normalizer.normalize(&params);

        // Known-but-disabled is a policy failure; unknown names fall through
        // to the invoker, which reports its own error.
        if self.registry.metadata(&tool).is_some() && !self.registry.is_enabled(&tool) {
            let err = BridgeError::tool_disabled(&tool);
            warn!(tool = %tool, "skipping disabled tool");
            return BatchCommandResult::failed(Some(tool), err.to_string(), elapsed(started));
        }

        match self.invoker.invoke(&tool, params).await {
            Ok(ToolOutcome::Success { result }) => {
                BatchCommandResult::succeeded(tool, result, elapsed(started))
            }
            Ok(ToolOutcome::Failure { message, .. }) => {
                BatchCommandResult::failed(Some(tool), message, elapsed(started))
            }
            Err(e) => {
                let message = format!("tool invocation failed: {e}");
                warn!(tool = %tool, error = %e, "tool invocation threw");
                BatchCommandResult::failed(Some(tool), message, elapsed(started))
            }
        }
    }
}
