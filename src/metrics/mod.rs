//! In-process counters with a Prometheus text export.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Inbound frames received
    pub frames_received: AtomicU64,
    /// Total requests dispatched
    pub requests_total: AtomicU64,
    /// Successful requests
    pub requests_success: AtomicU64,
    /// Failed requests
    pub requests_failed: AtomicU64,
    /// Tool calls
    pub tool_calls: AtomicU64,
    /// Resource reads
    pub resource_reads: AtomicU64,
    /// Completed document conversions
    pub conversions: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_frames(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_calls(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_resource_reads(&self) {
        self.resource_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_conversions(&self) {
        self.conversions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            resource_reads: self.resource_reads.load(Ordering::Relaxed),
            conversions: self.conversions.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let series = [
            ("frames_received", "Inbound frames received", s.frames_received),
            ("requests_total", "Total number of requests", s.requests_total),
            ("requests_success", "Successful requests", s.requests_success),
            ("requests_failed", "Failed requests", s.requests_failed),
            ("tool_calls", "Tool calls count", s.tool_calls),
            ("resource_reads", "Resource reads count", s.resource_reads),
            ("conversions", "Completed document conversions", s.conversions),
        ];

        let mut out = String::new();
        for (name, help, value) in series {
            out.push_str(&format!(
                "# HELP figma_mcp_{name} {help}\n# TYPE figma_mcp_{name} counter\nfigma_mcp_{name} {value}\n\n"
            ));
        }
        out
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_failed: u64,
    pub tool_calls: u64,
    pub resource_reads: u64,
    pub conversions: u64,
}

/// Timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.inc_requests();
        metrics.inc_requests();
        metrics.inc_success();
        metrics.inc_failed();
        metrics.inc_tool_calls();

        let s = metrics.snapshot();
        assert_eq!(s.requests_total, 2);
        assert_eq!(s.requests_success, 1);
        assert_eq!(s.requests_failed, 1);
        assert_eq!(s.tool_calls, 1);
        assert_eq!(s.conversions, 0);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.inc_conversions();
        let text = metrics.to_prometheus();
        assert!(text.contains("# TYPE figma_mcp_conversions counter"));
        assert!(text.contains("figma_mcp_conversions 1\n"));
        assert!(text.contains("figma_mcp_requests_total 0\n"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        assert!(timer.elapsed_ms() < 60_000);
    }
}
