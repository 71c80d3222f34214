//! End-to-end tests: batch dispatch and test-run jobs wired against a small
//! in-memory editor stand-in.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use stagehand::batch::BatchDispatcher;
use stagehand::config::BridgeConfig;
use stagehand::normalize::{NormalizeCounters, Normalizer};
use stagehand::registry::{ToolInvoker, ToolRegistry};
use stagehand::telemetry::NullSink;
use stagehand::test_jobs::{TestJobManager, TestRunner};
use stageproto::{
    BatchRequest, JobStatus, ResponseEnvelope, RunMode, RunTestsRequest, TestFilter, ToolMetadata,
    ToolOutcome,
};

/// A tiny scene graph: tools create objects and query them, so later batch
/// commands can observe earlier ones' side effects.
#[derive(Default)]
struct FakeEditor {
    objects: Mutex<Vec<String>>,
}

struct EditorRegistry;

impl ToolRegistry for EditorRegistry {
    fn metadata(&self, tool: &str) -> Option<ToolMetadata> {
        let known: HashSet<&str> = ["gameobject_create", "gameobject_find", "scene_reset"]
            .into_iter()
            .collect();
        known.contains(tool).then(|| ToolMetadata {
            name: tool.to_string(),
            description: String::new(),
            input_schema: json!({"type": "object"}),
        })
    }

    fn is_enabled(&self, tool: &str) -> bool {
        tool != "scene_reset"
    }
}

#[async_trait]
impl ToolInvoker for FakeEditor {
    async fn invoke(&self, tool: &str, params: Value) -> anyhow::Result<ToolOutcome> {
        match tool {
            "gameobject_create" => {
                let name = params["objectName"]
                    .as_str()
                    .ok_or_else(|| anyhow::anyhow!("missing objectName"))?
                    .to_string();
                self.objects.lock().unwrap().push(name.clone());
                Ok(ToolOutcome::success(json!({"created": name})))
            }
            "gameobject_find" => {
                let name = params["objectName"].as_str().unwrap_or_default();
                let found = self.objects.lock().unwrap().iter().any(|o| o == name);
                if found {
                    Ok(ToolOutcome::success(json!({"found": true})))
                } else {
                    Ok(ToolOutcome::failure(format!("no object named {name:?}")))
                }
            }
            other => anyhow::bail!("unknown tool: {other}"),
        }
    }
}

fn dispatcher(editor: Arc<FakeEditor>) -> BatchDispatcher {
    BatchDispatcher::new(
        Arc::new(EditorRegistry),
        editor,
        Normalizer::new(NormalizeCounters::new(), Arc::new(NullSink)),
        BridgeConfig::default(),
    )
}

#[tokio::test]
async fn batch_commands_see_prior_side_effects() {
    let editor = Arc::new(FakeEditor::default());
    let dispatcher = dispatcher(editor);

    // Command 2 reads state mutated by command 1; snake_case params get
    // normalized to what the handler expects.
    let env = dispatcher
        .execute(BatchRequest {
            commands: vec![
                json!({"tool": "gameobject_create", "params": {"object_name": "Player"}}),
                json!({"tool": "gameobject_find", "params": {"object_name": "Player"}}),
            ],
            fail_fast: false,
            parallel: false,
            max_parallelism: None,
        })
        .await;

    match env {
        ResponseEnvelope::Success { data } => {
            assert_eq!(data["overall_success"], true);
            assert_eq!(data["results"][1]["result"]["found"], true);
        }
        other => panic!("expected success envelope, got {other:?}"),
    }
}

#[tokio::test]
async fn disabled_tool_fails_without_stopping_the_batch() {
    let editor = Arc::new(FakeEditor::default());
    let dispatcher = dispatcher(editor);

    let env = dispatcher
        .execute(BatchRequest {
            commands: vec![
                json!({"tool": "scene_reset"}),
                json!({"tool": "gameobject_create", "params": {"object_name": "Camera"}}),
            ],
            fail_fast: false,
            parallel: false,
            max_parallelism: None,
        })
        .await;

    match env {
        ResponseEnvelope::Error { error, data } => {
            assert_eq!(error.code(), "invocation_failed");
            let data = data.unwrap();
            assert_eq!(data["results"][0]["success"], false);
            assert_eq!(data["results"][1]["success"], true);
            assert_eq!(data["failure_count"], 1);
        }
        other => panic!("expected error envelope, got {other:?}"),
    }
}

/// Runner that finishes quickly with a summary payload.
struct QuickRunner;

#[async_trait]
impl TestRunner for QuickRunner {
    async fn run(&self, mode: RunMode, filter: &TestFilter) -> anyhow::Result<Value> {
        Ok(json!({
            "mode": mode.as_str(),
            "filtered": !filter.is_empty(),
            "passed": 3,
            "failed": 0,
        }))
    }
}

#[tokio::test]
async fn start_then_poll_test_run_to_completion() {
    let manager = TestJobManager::new();

    let started = manager
        .start(
            Arc::new(QuickRunner),
            &RunTestsRequest {
                mode: Some("EditMode".to_string()),
                include_details: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(started.status, JobStatus::Running);
    assert!(started.include_details);

    // Immediate poll: running or already terminal if the runner was fast.
    let snap = manager.poll(started.job_id.as_str(), 0).await.unwrap();
    assert!(snap.status == JobStatus::Running || snap.status == JobStatus::Completed);

    // Bounded wait lands on the terminal state.
    let snap = manager.poll(started.job_id.as_str(), 5_000).await.unwrap();
    assert_eq!(snap.status, JobStatus::Completed);
    assert_eq!(snap.result.as_ref().unwrap()["passed"], 3);
    assert_eq!(snap.mode, RunMode::EditMode);
    assert!(snap.include_details);
}
