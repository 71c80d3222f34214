//! Protocol types for the Stagehand editor command bridge.
//!
//! Shared between the bridge core and anything that speaks to it: request
//! shapes, typed responses, the success/error envelope, and the job domain
//! types. This crate is pure types - serde, schemars, and nothing with a
//! runtime.
//!
//! ## Layout
//!
//! - [`domain`] - `JobId`, `JobStatus`, `RunMode`, `TestFilter`
//! - [`request`] - caller-submitted shapes (`BatchRequest`, `RunTestsRequest`, ...)
//! - [`responses`] - typed results (`BatchSummary`, `JobSnapshot`, `ToolOutcome`, ...)
//! - [`envelope`] - `ResponseEnvelope` and the `BridgeError` category enum

pub mod domain;
pub mod envelope;
pub mod request;
pub mod responses;

pub use domain::{JobId, JobStatus, RunMode, TestFilter};
pub use envelope::{BridgeError, ResponseEnvelope};
pub use request::{BatchRequest, CommandEntry, PollJobRequest, RunTestsRequest};
pub use responses::{
    BatchCommandResult, BatchSummary, JobSnapshot, RunStartedResponse, ToolMetadata, ToolOutcome,
};
