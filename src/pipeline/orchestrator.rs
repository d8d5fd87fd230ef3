// src/pipeline/orchestrator.rs
//
// Drives the session: pull frames from the vision collaborator, gate them
// on the evaluation cadence, run scoring cycles one at a time, and hand
// the resulting events to the sinks. Ends on shutdown or when the source
// runs dry.

use super::metrics::ScoringMetrics;
use super::scheduler::CycleScheduler;
use super::shutdown::ShutdownSignal;
use super::sink::ScoreSink;
use super::ScoreEvent;
use crate::adapters::vision::DetectionSource;
use crate::scoring::{ClassLabels, CycleOutcome, ScoringEngine};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub initial_score: f64,
    pub final_score: f64,
    pub frames_seen: u64,
    pub cycles_completed: u64,
    pub cycles_aborted: u64,
    pub deductions_applied: u64,
    pub telemetry_accepted: u64,
    pub telemetry_rejected: u64,
}

pub struct PipelineOrchestrator<S: DetectionSource> {
    engine: ScoringEngine,
    source: S,
    scheduler: CycleScheduler,
    sinks: Vec<Box<dyn ScoreSink>>,
    labels: ClassLabels,
    detection_threshold: f32,
    metrics: ScoringMetrics,
    session_id: Uuid,
    initial_score: f64,
}

impl<S: DetectionSource> PipelineOrchestrator<S> {
    pub fn new(
        engine: ScoringEngine,
        source: S,
        frame_skip_interval: u64,
        metrics: ScoringMetrics,
    ) -> Self {
        let initial_score = engine.score();
        Self {
            engine,
            source,
            scheduler: CycleScheduler::new(frame_skip_interval),
            sinks: Vec::new(),
            labels: ClassLabels::default(),
            detection_threshold: 0.0,
            metrics,
            session_id: Uuid::new_v4(),
            initial_score,
        }
    }

    pub fn with_sinks(mut self, sinks: Vec<Box<dyn ScoreSink>>) -> Self {
        self.sinks = sinks;
        self
    }

    /// Labels and threshold used only for the per-frame detection log.
    pub fn with_labels(mut self, labels: ClassLabels, detection_threshold: f32) -> Self {
        self.labels = labels;
        self.detection_threshold = detection_threshold;
        self
    }

    pub async fn run(mut self, mut shutdown: ShutdownSignal) -> Result<SessionSummary> {
        let started_at = Utc::now();
        info!("▶ Scoring session {} started", self.session_id);

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    info!("Shutdown requested, stopping session");
                    break;
                }
                next = self.source.next_frame() => next,
            };

            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Detection source exhausted");
                    break;
                }
                Err(e) => {
                    error!("Detection source failed: {:#}", e);
                    break;
                }
            };

            self.metrics.inc(&self.metrics.frames_seen);
            if !self.scheduler.should_evaluate() {
                continue;
            }

            self.log_detections(frame.frame_id, &frame.detections);
            let report = self.engine.run_cycle(&frame.detections, &mut shutdown).await;
            self.dispatch_events();

            if !report.deductions.is_empty() {
                debug!(
                    "Cycle {}: {} deduction(s), -{:.1}, score {:.1}",
                    report.cycle,
                    report.deductions.len(),
                    report.total_deducted(),
                    report.score
                );
            }

            if report.outcome == CycleOutcome::Aborted {
                break;
            }
        }

        let stats = self.scheduler.get_stats();
        debug!(
            "Scheduler: {} cycles over {} frames ({:.0}%)",
            stats.cycles_scheduled,
            stats.frames_seen,
            stats.evaluation_frequency * 100.0
        );

        let summary = self.summary(started_at);
        self.publish(&ScoreEvent::SessionEnded(summary.clone()));
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                warn!("Score sink flush failed: {:#}", e);
            }
        }

        Ok(summary)
    }

    fn log_detections(&self, frame_id: u64, detections: &[crate::types::DetectionEvent]) {
        let seen: Vec<String> = detections
            .iter()
            .filter(|d| d.confidence >= self.detection_threshold)
            .map(|d| format!("{} ({:.2})", self.labels.label(d.class_id), d.confidence))
            .collect();
        if !seen.is_empty() {
            debug!("🔍 Frame {}: {}", frame_id, seen.join(", "));
        }
    }

    fn dispatch_events(&mut self) {
        for event in self.engine.drain_events() {
            self.publish(&event);
        }
    }

    fn publish(&mut self, event: &ScoreEvent) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.publish(event) {
                warn!("Score sink failed: {:#}", e);
            }
        }
    }

    fn summary(&self, started_at: DateTime<Utc>) -> SessionSummary {
        let metrics = self.metrics.summary();
        SessionSummary {
            session_id: self.session_id,
            started_at,
            ended_at: Utc::now(),
            initial_score: self.initial_score,
            final_score: self.engine.score(),
            frames_seen: metrics.frames_seen,
            cycles_completed: metrics.cycles_completed,
            cycles_aborted: metrics.cycles_aborted,
            deductions_applied: metrics.deductions_applied,
            telemetry_accepted: metrics.telemetry_accepted,
            telemetry_rejected: metrics.telemetry_rejected,
        }
    }
}
