use metrics::{Counter, Gauge, Histogram};
use std::time::Duration;

/// Render-side counters and timings.
///
/// Handles are noop-backed until a recorder is installed, so recording is
/// always safe to call.
pub struct RenderMetrics {
    pub captures_local: Counter,
    pub captures_remote: Counter,
    pub captures_failed: Counter,
    pub capture_duration: Histogram,
    pub live_contexts: Gauge,
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self {
            captures_local: Counter::noop(),
            captures_remote: Counter::noop(),
            captures_failed: Counter::noop(),
            capture_duration: Histogram::noop(),
            live_contexts: Gauge::noop(),
        }
    }

    pub fn record_local(&self, duration: Duration) {
        self.captures_local.increment(1);
        self.capture_duration.record(duration.as_secs_f64());
    }

    pub fn record_remote(&self, duration: Duration) {
        self.captures_remote.increment(1);
        self.capture_duration.record(duration.as_secs_f64());
    }

    pub fn record_failure(&self) {
        self.captures_failed.increment(1);
    }

    pub fn set_live_contexts(&self, count: usize) {
        self.live_contexts.set(count as f64);
    }
}

impl Default for RenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}
