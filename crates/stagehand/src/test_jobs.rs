//! Asynchronous test-run job tracking.
//!
//! The test runner is a single-slot resource: at most one job may be Running
//! at a time, enforced by check-and-set under one mutex so two concurrent
//! starts cannot both win. The accepted job's work runs on a spawned task
//! outside the caller's lifetime; callers poll for completion with a bounded
//! wait. A stuck job can be force-cleared without waiting for the runner.
//!
//! A runner finishing after its job was cleared or superseded must not
//! resurrect the slot: completion lands only if the slot still holds the same
//! job id in Running state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use stageproto::{
    BridgeError, JobId, JobSnapshot, JobStatus, RunMode, RunStartedResponse, RunTestsRequest,
    TestFilter,
};

/// Suggested backoff returned with the already-running condition.
pub const RETRY_AFTER_MS: u64 = 2_000;

/// Executes a test run out of band. The host wires in the real runner; the
/// manager only records the terminal status and payload it reports.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, mode: RunMode, filter: &TestFilter) -> anyhow::Result<Value>;
}

/// The single in-flight or most recently finished job.
#[derive(Debug, Clone)]
struct TestJob {
    id: JobId,
    mode: RunMode,
    include_details: bool,
    include_failed_tests: bool,
    status: JobStatus,
    result: Option<Value>,
    error: Option<String>,
    created_at: chrono::DateTime<Utc>,
    finished_at: Option<chrono::DateTime<Utc>>,
}

impl TestJob {
    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id.clone(),
            status: self.status,
            mode: self.mode,
            include_details: self.include_details,
            include_failed_tests: self.include_failed_tests,
            result: self.result.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// Single-slot job state machine. Cheap to clone; clones share the slot.
#[derive(Clone)]
pub struct TestJobManager {
    slot: Arc<Mutex<Option<TestJob>>>,
    // Bumped on every state change so pollers can wait without spinning.
    changed: watch::Sender<u64>,
}

impl TestJobManager {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            slot: Arc::new(Mutex::new(None)),
            changed,
        }
    }

    /// Start a test run. Fails with the distinguishable already-running
    /// condition when a job is Running; otherwise allocates an id, takes the
    /// slot, and hands the work to the runner on a spawned task.
    pub fn start(
        &self,
        runner: Arc<dyn TestRunner>,
        request: &RunTestsRequest,
    ) -> Result<RunStartedResponse, BridgeError> {
        let mode = match request.mode.as_deref() {
            None => RunMode::default(),
            Some(raw) => RunMode::from_str_name(raw).ok_or_else(|| {
                BridgeError::validation_field(
                    "invalid_mode",
                    format!("unrecognized run mode {raw:?}; expected EditMode or PlayMode"),
                    "mode",
                )
            })?,
        };

        if request.clear_stuck {
            let _ = self.clear_stuck_job();
        }

        let filter = request.filter();
        let job = TestJob {
            id: JobId::new(),
            mode,
            include_details: request.include_details,
            include_failed_tests: request.include_failed_tests,
            status: JobStatus::Running,
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        };
        let job_id = job.id.clone();

        // Idle -> Running is a check-and-set under the slot lock: the one
        // choke point for the single-slot invariant.
        {
            let mut slot = self.slot.lock().unwrap();
            if let Some(current) = slot.as_ref() {
                if current.status == JobStatus::Running {
                    return Err(BridgeError::already_running(
                        current.id.as_str(),
                        RETRY_AFTER_MS,
                    ));
                }
            }
            *slot = Some(job);
        }
        self.notify_change();

        info!(
            job.id = %job_id,
            job.mode = %mode,
            filtered = !filter.is_empty(),
            "test run started"
        );

        let manager = self.clone();
        let spawned_id = job_id.clone();
        tokio::spawn(async move {
            let outcome = runner.run(mode, &filter).await;
            manager.finish(&spawned_id, outcome);
        });

        Ok(RunStartedResponse {
            job_id,
            status: JobStatus::Running,
            mode,
            include_details: request.include_details,
            include_failed_tests: request.include_failed_tests,
        })
    }

    /// Record the runner's terminal outcome, unless the job was cleared or
    /// superseded in the meantime.
    fn finish(&self, job_id: &JobId, outcome: anyhow::Result<Value>) {
        {
            let mut slot = self.slot.lock().unwrap();
            let job = match slot.as_mut() {
                Some(job) if job.id == *job_id && job.status == JobStatus::Running => job,
                _ => {
                    debug!(job.id = %job_id, "dropping result for cleared or superseded job");
                    return;
                }
            };

            job.finished_at = Some(Utc::now());
            match outcome {
                Ok(result) => {
                    job.status = JobStatus::Completed;
                    job.result = Some(result);
                    info!(job.id = %job_id, "test run completed");
                }
                Err(e) => {
                    job.status = JobStatus::Failed;
                    job.error = Some(e.to_string());
                    error!(job.id = %job_id, job.error = %e, "test run failed");
                }
            }
        }
        self.notify_change();
    }

    /// Force a Running job to Cleared, freeing the slot. Returns false when
    /// nothing is Running (a no-op, not an error).
    pub fn clear_stuck_job(&self) -> bool {
        let cleared = {
            let mut slot = self.slot.lock().unwrap();
            match slot.as_mut() {
                Some(job) if job.status == JobStatus::Running => {
                    job.status = JobStatus::Cleared;
                    job.finished_at = Some(Utc::now());
                    warn!(job.id = %job.id, "stuck test run force-cleared");
                    true
                }
                _ => false,
            }
        };
        if cleared {
            self.notify_change();
        }
        cleared
    }

    /// Current status of the slot's job, or not-found for an unknown id.
    pub fn status(&self, job_id: &str) -> Result<JobSnapshot, BridgeError> {
        let slot = self.slot.lock().unwrap();
        slot.as_ref()
            .filter(|job| job.id.as_str() == job_id)
            .map(TestJob::snapshot)
            .ok_or_else(|| BridgeError::not_found("job", job_id))
    }

    /// Poll a job, optionally waiting up to `wait_timeout_ms` for a terminal
    /// state. On timeout the best-known status is returned; the wait is
    /// never unbounded.
    pub async fn poll(
        &self,
        job_id: &str,
        wait_timeout_ms: u64,
    ) -> Result<JobSnapshot, BridgeError> {
        let deadline = Instant::now() + Duration::from_millis(wait_timeout_ms);
        let mut rx = self.changed.subscribe();

        loop {
            let snap = self.status(job_id)?;
            if snap.status.is_terminal() {
                return Ok(snap);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(snap);
            }

            match tokio::time::timeout(deadline - now, rx.changed()).await {
                Ok(Ok(())) => continue,
                // Timed out, or the sender is gone; report what we know.
                _ => return self.status(job_id),
            }
        }
    }

    fn notify_change(&self) {
        self.changed.send_modify(|generation| *generation += 1);
    }
}

impl Default for TestJobManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::Notify;

    /// Runner that blocks until released, then reports the given outcome.
    struct GatedRunner {
        release: Notify,
        fail: bool,
    }

    impl GatedRunner {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                release: Notify::new(),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                release: Notify::new(),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl TestRunner for GatedRunner {
        async fn run(&self, mode: RunMode, filter: &TestFilter) -> anyhow::Result<Value> {
            self.release.notified().await;
            if self.fail {
                anyhow::bail!("3 tests failed");
            }
            Ok(json!({"mode": mode.as_str(), "filtered": !filter.is_empty(), "passed": 12}))
        }
    }

    fn edit_mode_request() -> RunTestsRequest {
        RunTestsRequest {
            mode: Some("EditMode".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn start_then_immediate_poll_reports_running() {
        let manager = TestJobManager::new();
        let runner = GatedRunner::ok();

        let started = manager.start(runner.clone(), &edit_mode_request()).unwrap();
        assert_eq!(started.status, JobStatus::Running);
        assert_eq!(started.mode, RunMode::EditMode);

        let snap = manager.poll(started.job_id.as_str(), 0).await.unwrap();
        assert_eq!(snap.status, JobStatus::Running);
        assert!(snap.result.is_none());
    }

    #[tokio::test]
    async fn poll_waits_for_completion() {
        let manager = TestJobManager::new();
        let runner = GatedRunner::ok();
        let started = manager.start(runner.clone(), &edit_mode_request()).unwrap();

        runner.release.notify_one();
        let snap = manager.poll(started.job_id.as_str(), 5_000).await.unwrap();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.result.as_ref().unwrap()["passed"], 12);
        assert!(snap.finished_at.is_some());
        assert!(snap.duration_ms().is_some());
    }

    #[tokio::test]
    async fn runner_error_marks_failed() {
        let manager = TestJobManager::new();
        let runner = GatedRunner::failing();
        let started = manager.start(runner.clone(), &edit_mode_request()).unwrap();

        runner.release.notify_one();
        let snap = manager.poll(started.job_id.as_str(), 5_000).await.unwrap();
        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(snap.error.as_deref(), Some("3 tests failed"));
        assert!(snap.result.is_none());
    }

    #[tokio::test]
    async fn second_start_rejected_while_running() {
        let manager = TestJobManager::new();
        let runner = GatedRunner::ok();
        let started = manager.start(runner.clone(), &edit_mode_request()).unwrap();

        let err = manager
            .start(runner.clone(), &edit_mode_request())
            .unwrap_err();
        match err {
            BridgeError::JobAlreadyRunning {
                job_id,
                retry_after_ms,
            } => {
                assert_eq!(job_id, started.job_id.as_str());
                assert_eq!(retry_after_ms, RETRY_AFTER_MS);
            }
            other => panic!("expected JobAlreadyRunning, got {other:?}"),
        }

        // The original job is untouched.
        let snap = manager.poll(started.job_id.as_str(), 0).await.unwrap();
        assert_eq!(snap.job_id, started.job_id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_accept_exactly_one() {
        let manager = TestJobManager::new();
        let runner = GatedRunner::ok();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let runner = runner.clone();
                tokio::spawn(async move { manager.start(runner, &edit_mode_request()).is_ok() })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn clear_stuck_frees_the_slot() {
        let manager = TestJobManager::new();
        let runner = GatedRunner::ok();
        let started = manager.start(runner.clone(), &edit_mode_request()).unwrap();

        assert!(manager.clear_stuck_job());
        assert!(!manager.clear_stuck_job());

        let snap = manager.poll(started.job_id.as_str(), 0).await.unwrap();
        assert_eq!(snap.status, JobStatus::Cleared);

        // The slot is free: a new start is accepted and gets a fresh id.
        let second = manager.start(GatedRunner::ok(), &edit_mode_request()).unwrap();
        assert_ne!(second.job_id, started.job_id);
    }

    #[tokio::test]
    async fn late_runner_result_does_not_resurrect_cleared_job() {
        let manager = TestJobManager::new();
        let runner = GatedRunner::ok();
        let started = manager.start(runner.clone(), &edit_mode_request()).unwrap();

        assert!(manager.clear_stuck_job());
        runner.release.notify_one();
        tokio::task::yield_now().await;

        let snap = manager.poll(started.job_id.as_str(), 50).await.unwrap();
        assert_eq!(snap.status, JobStatus::Cleared);
        assert!(snap.result.is_none());
    }

    #[tokio::test]
    async fn clear_stuck_flag_on_start_recovers_the_slot() {
        let manager = TestJobManager::new();
        let stuck = GatedRunner::ok();
        manager.start(stuck, &edit_mode_request()).unwrap();

        let request = RunTestsRequest {
            clear_stuck: true,
            ..edit_mode_request()
        };
        let started = manager.start(GatedRunner::ok(), &request).unwrap();
        assert_eq!(started.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn unknown_job_id_is_not_found() {
        let manager = TestJobManager::new();
        let err = manager.poll("no-such-job", 0).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn unrecognized_mode_is_a_validation_error() {
        let manager = TestJobManager::new();
        let request = RunTestsRequest {
            mode: Some("TurboMode".to_string()),
            ..Default::default()
        };
        let err = manager.start(GatedRunner::ok(), &request).unwrap_err();
        assert_eq!(err.code(), "invalid_mode");
    }

    #[tokio::test]
    async fn omitted_mode_defaults_to_edit_mode() {
        let manager = TestJobManager::new();
        let started = manager
            .start(GatedRunner::ok(), &RunTestsRequest::default())
            .unwrap();
        assert_eq!(started.mode, RunMode::EditMode);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_timeout_returns_best_known_status() {
        let manager = TestJobManager::new();
        let runner = GatedRunner::ok();
        let started = manager.start(runner.clone(), &edit_mode_request()).unwrap();

        // Runner never released; the bounded wait elapses (virtual time).
        let snap = manager.poll(started.job_id.as_str(), 500).await.unwrap();
        assert_eq!(snap.status, JobStatus::Running);
    }
}
