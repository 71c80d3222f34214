//! Parameter key normalization.
//!
//! Agent clients send tool parameters with inconsistent key casing
//! (snake_case, camelCase, sometimes both in one payload). Before a tool is
//! invoked its params are canonicalized to camelCase, recursively, with two
//! exceptions copied verbatim: bridge-internal fields (`__` prefix) and
//! property/shader-style names (`_` prefix, e.g. `_MainTex`).
//!
//! Counters are injected rather than hidden statics so tests can construct
//! fresh instances; increments are atomic because batches arrive concurrently
//! from different transport connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::telemetry::TelemetrySink;

/// Keys with this prefix are bridge-internal and copied verbatim.
pub const INTERNAL_PREFIX: &str = "__";

/// Keys with this prefix are property/shader-style names (`_MainTex`) and
/// copied verbatim.
pub const PROPERTY_PREFIX: &str = "_";

/// Counter snapshot is emitted every this many top-level normalize calls.
const FLUSH_INTERVAL: u64 = 200;

/// Process-wide normalization counters. Never reset; shared via `Arc`.
#[derive(Debug, Default)]
pub struct NormalizeCounters {
    calls: AtomicU64,
    objects: AtomicU64,
    preserved_keys: AtomicU64,
    collisions: AtomicU64,
    camel_case_wins: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub calls: u64,
    pub objects: u64,
    pub preserved_keys: u64,
    pub collisions: u64,
    pub camel_case_wins: u64,
}

impl NormalizeCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            objects: self.objects.load(Ordering::Relaxed),
            preserved_keys: self.preserved_keys.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            camel_case_wins: self.camel_case_wins.load(Ordering::Relaxed),
        }
    }
}

/// Canonicalizes parameter trees. Cheap to clone; holds only shared handles.
#[derive(Clone)]
pub struct Normalizer {
    counters: Arc<NormalizeCounters>,
    sink: Arc<dyn TelemetrySink>,
}

impl Normalizer {
    pub fn new(counters: Arc<NormalizeCounters>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self { counters, sink }
    }

    pub fn counters(&self) -> &NormalizeCounters {
        &self.counters
    }

    /// Normalize a parameter tree. Scalars pass through; mappings get
    /// canonical camelCase keys; sequences are normalized element-wise.
    pub fn normalize(&self, value: &Value) -> Value {
        let calls = self.counters.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let out = self.normalize_value(value);
        if calls % FLUSH_INTERVAL == 0 {
            self.flush(calls);
        }
        out
    }

    fn normalize_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => self.normalize_map(map),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.normalize_value(v)).collect())
            }
            scalar => scalar.clone(),
        }
    }

    fn normalize_map(&self, map: &Map<String, Value>) -> Value {
        self.counters.objects.fetch_add(1, Ordering::Relaxed);

        let mut out = Map::with_capacity(map.len());
        // Tracks whether the kept key for each target was already camelCase
        // in the original, which decides collision replacement.
        let mut kept_was_camel: HashMap<String, bool> = HashMap::new();

        for (key, value) in map {
            let normalized_value = self.normalize_value(value);

            if is_preserved(key) {
                self.counters.preserved_keys.fetch_add(1, Ordering::Relaxed);
                out.insert(key.clone(), normalized_value);
                continue;
            }

            let target = to_camel_case(key);
            let incoming_was_camel = target == *key;

            match kept_was_camel.get(&target).copied() {
                None => {
                    kept_was_camel.insert(target.clone(), incoming_was_camel);
                    out.insert(target, normalized_value);
                }
                Some(prior_was_camel) => {
                    self.counters.collisions.fetch_add(1, Ordering::Relaxed);
                    if incoming_was_camel && !prior_was_camel {
                        // Explicit camelCase beats a transformed key. Ties
                        // between two camelCase originals keep first-seen.
                        self.counters.camel_case_wins.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            key = %target,
                            original = %key,
                            "key collision: explicit camelCase key replaces earlier value"
                        );
                        kept_was_camel.insert(target.clone(), true);
                        out.insert(target, normalized_value);
                    } else {
                        tracing::warn!(
                            key = %target,
                            original = %key,
                            "key collision: dropping later key, first-seen value kept"
                        );
                    }
                }
            }
        }

        Value::Object(out)
    }

    /// Emit a counter snapshot to the telemetry sink and debug log. The sink
    /// is fire-and-forget; an unavailable sink never fails normalization.
    fn flush(&self, calls: u64) {
        let snap = self.counters.snapshot();
        let fields = serde_json::to_value(snap).unwrap_or(Value::Null);
        self.sink.record_event("normalize_counters", fields);
        tracing::debug!(
            calls,
            objects = snap.objects,
            preserved = snap.preserved_keys,
            collisions = snap.collisions,
            camel_case_wins = snap.camel_case_wins,
            "normalization counter snapshot"
        );
    }
}

/// True when the key must be copied verbatim.
fn is_preserved(key: &str) -> bool {
    key.starts_with(INTERNAL_PREFIX) || key.starts_with(PROPERTY_PREFIX)
}

/// snake_case -> camelCase: split on underscores, drop empty segments,
/// lowercase the first character of the first segment, capitalize the first
/// character of each later segment. Already-camelCase keys are fixed points.
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for segment in key.split('_').filter(|s| !s.is_empty()) {
        let mut chars = segment.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => continue,
        };
        if out.is_empty() {
            out.extend(first.to_lowercase());
        } else {
            out.extend(first.to_uppercase());
        }
        out.push_str(chars.as_str());
    }
    out
}
