//! Telemetry sink boundary and tracing initialization.
//!
//! The transport behind the sink (OTLP, HTTP, whatever the host wires in) is
//! out of scope for this crate; the contract is fire-and-forget. A sink
//! implementation must never propagate failures back to the caller.

use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Fire-and-forget event sink.
///
/// Implementations must be infallible from the caller's perspective: swallow
/// delivery errors, never block the calling operation.
pub trait TelemetrySink: Send + Sync {
    fn record_event(&self, event: &str, fields: Value);
}

/// Default sink: events become debug-level log lines.
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record_event(&self, event: &str, fields: Value) {
        tracing::debug!(event, %fields, "telemetry event");
    }
}

/// Discards everything. Useful in tests.
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record_event(&self, _event: &str, _fields: Value) {}
}

/// Initialize the tracing subscriber with an env-filter.
///
/// Honors `RUST_LOG`; defaults to info with debug for this crate.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stagehand=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
