//! Boundary traits for the tool catalog and tool invocation.
//!
//! The concrete catalog (scene/asset/gameobject handlers) lives in the host;
//! the dispatcher only needs discovery and an invocation seam. Invocations
//! return the tagged [`ToolOutcome`] contract - success or failure is
//! explicit, never inferred from result shape.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde_json::Value;

use stageproto::{ToolMetadata, ToolOutcome};

/// Generate a JSON schema for a parameter type, for registry metadata.
pub fn schema_for<T: JsonSchema>() -> Value {
    let settings = schemars::generate::SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
    });
    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or_default()
}

/// Tool discovery: name -> metadata and enabled/disabled state.
pub trait ToolRegistry: Send + Sync {
    /// Metadata for a tool, or None when the name is unknown.
    fn metadata(&self, tool: &str) -> Option<ToolMetadata>;

    /// Whether a known tool is currently enabled. Callers should check
    /// `metadata` first; the answer for unknown tools is unspecified.
    fn is_enabled(&self, tool: &str) -> bool;
}

/// Executes a named tool with normalized parameters.
///
/// Awaited to completion per call: the dispatcher relies on this to give
/// commands in a batch their ordering guarantee. May error ("throw"); that is
/// captured per command, never crashing the batch.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool: &str, params: Value) -> anyhow::Result<ToolOutcome>;
}
