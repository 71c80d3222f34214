//! Stagehand - editor command bridge core.
//!
//! Lets an external AI-agent client invoke named tools against a running
//! interactive application. Three pieces:
//!
//! - [`normalize`] - canonicalizes heterogeneous, case-inconsistent JSON
//!   parameter payloads into camelCase with deterministic collision handling
//!   and atomic usage counters.
//! - [`batch`] - executes a list of commands strictly sequentially with
//!   per-command failure isolation, fail-fast policy, and a configurable
//!   size limit.
//! - [`test_jobs`] - single-slot lifecycle for a long-running test run:
//!   start, poll with bounded wait, force-clear when stuck.
//!
//! The tool catalog, the tool handlers, and the transport carrying requests
//! here are host concerns behind the traits in [`registry`], [`telemetry`],
//! and [`test_jobs::TestRunner`].

pub mod batch;
pub mod config;
pub mod normalize;
pub mod registry;
pub mod telemetry;
pub mod test_jobs;

pub use batch::BatchDispatcher;
pub use config::BridgeConfig;
pub use normalize::{NormalizeCounters, Normalizer};
pub use registry::{schema_for, ToolInvoker, ToolRegistry};
pub use telemetry::{init_tracing, NullSink, TelemetrySink, TracingSink};
pub use test_jobs::{TestJobManager, TestRunner};
