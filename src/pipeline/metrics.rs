// src/pipeline/metrics.rs
//
// Shared counters. Cloned into the MQTT listener and the engine; the
// orchestrator reads a summary at shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ScoringMetrics {
    pub frames_seen: Arc<AtomicU64>,
    pub cycles_completed: Arc<AtomicU64>,
    pub cycles_aborted: Arc<AtomicU64>,
    pub detections_considered: Arc<AtomicU64>,
    pub detections_below_threshold: Arc<AtomicU64>,
    pub deductions_applied: Arc<AtomicU64>,
    pub telemetry_accepted: Arc<AtomicU64>,
    pub telemetry_rejected: Arc<AtomicU64>,
    pub cycle_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            frames_seen: Arc::new(AtomicU64::new(0)),
            cycles_completed: Arc::new(AtomicU64::new(0)),
            cycles_aborted: Arc::new(AtomicU64::new(0)),
            detections_considered: Arc::new(AtomicU64::new(0)),
            detections_below_threshold: Arc::new(AtomicU64::new(0)),
            deductions_applied: Arc::new(AtomicU64::new(0)),
            telemetry_accepted: Arc::new(AtomicU64::new(0)),
            telemetry_rejected: Arc::new(AtomicU64::new(0)),
            cycle_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_seen: self.frames_seen.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_aborted: self.cycles_aborted.load(Ordering::Relaxed),
            detections_considered: self.detections_considered.load(Ordering::Relaxed),
            detections_below_threshold: self.detections_below_threshold.load(Ordering::Relaxed),
            deductions_applied: self.deductions_applied.load(Ordering::Relaxed),
            telemetry_accepted: self.telemetry_accepted.load(Ordering::Relaxed),
            telemetry_rejected: self.telemetry_rejected.load(Ordering::Relaxed),
            last_cycle_us: self.cycle_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsSummary {
    pub frames_seen: u64,
    pub cycles_completed: u64,
    pub cycles_aborted: u64,
    pub detections_considered: u64,
    pub detections_below_threshold: u64,
    pub deductions_applied: u64,
    pub telemetry_accepted: u64,
    pub telemetry_rejected: u64,
    pub last_cycle_us: u64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = ScoringMetrics::new();
        let listener_side = metrics.clone();
        listener_side.inc(&listener_side.telemetry_rejected);
        listener_side.inc(&listener_side.telemetry_rejected);
        metrics.inc(&metrics.cycles_completed);

        let summary = metrics.summary();
        assert_eq!(summary.telemetry_rejected, 2);
        assert_eq!(summary.cycles_completed, 1);
        assert_eq!(summary.cycles_aborted, 0);
    }
}
