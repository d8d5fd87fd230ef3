// src/scoring/engine.rs
//
// The per-cycle rule evaluator. One cycle:
//   1. snapshot telemetry (S0)
//   2. empty batch: required-flags check
//   3. otherwise each confident detection runs its class rule in order;
//      only the stop sign reads fresh telemetry, after its dwell
//   4. post-detection zone rule against a fresh snapshot (S1)
//   5. clear the sign slot
//   6. emit the score once
//
// Score is never clamped and may go below zero.

use super::penalty::BandTable;
use super::rules::{RuleBook, SignRule};
use super::sign::{SignClass, SignContext, ZoneKind};
use crate::pipeline::event_bus::{EventBus, ScoreEvent};
use crate::pipeline::metrics::ScoringMetrics;
use crate::pipeline::shutdown::ShutdownSignal;
use crate::telemetry::{Channel, TelemetrySnapshot, TelemetryStore};
use crate::types::{DetectionEvent, ScoringConfig};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionReason {
    /// Empty batch while the required flags are not all set
    NoDetections,
    SpeedLimit,
    StopSign,
    TurnRestriction(SignClass),
    SchoolZone,
    ConstructionZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Deduction {
    pub reason: DeductionReason,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleOutcome {
    Completed,
    /// Shutdown arrived during the stop dwell
    Aborted,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcome: CycleOutcome,
    pub deductions: Vec<Deduction>,
    pub score: f64,
}

impl CycleReport {
    pub fn total_deducted(&self) -> f64 {
        self.deductions.iter().map(|d| d.amount).sum()
    }
}

pub struct ScoringEngine {
    telemetry: Arc<TelemetryStore>,
    rules: RuleBook,
    speed_table: BandTable,
    school_table: BandTable,
    construction_table: BandTable,
    required_flags: Vec<Channel>,
    detection_threshold: f32,
    stop_dwell: Duration,
    no_detection_penalty: f64,
    stop_penalty: f64,
    turn_penalty: f64,

    score: f64,
    context: SignContext,
    cycle: u64,

    bus: EventBus,
    metrics: ScoringMetrics,
}

impl ScoringEngine {
    pub fn new(
        config: &ScoringConfig,
        telemetry: Arc<TelemetryStore>,
        metrics: ScoringMetrics,
        max_pending_events: usize,
    ) -> Self {
        Self {
            telemetry,
            rules: RuleBook::standard(),
            speed_table: BandTable::new(config.speed_bands.clone(), config.speed_offset),
            school_table: BandTable::new(config.school_bands.clone(), config.speed_offset),
            construction_table: BandTable::new(
                config.construction_bands.clone(),
                config.speed_offset,
            ),
            required_flags: config.required_flag_channels.clone(),
            detection_threshold: config.detection_threshold,
            stop_dwell: Duration::from_millis(config.stop_dwell_ms),
            no_detection_penalty: config.no_detection_penalty,
            stop_penalty: config.stop_penalty,
            turn_penalty: config.turn_penalty,
            score: config.initial_score,
            context: SignContext::Idle,
            cycle: 0,
            bus: EventBus::new(max_pending_events),
            metrics,
        }
    }

    #[cfg(test)]
    pub fn with_rules(mut self, rules: RuleBook) -> Self {
        self.rules = rules;
        self
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    #[cfg(test)]
    pub fn context(&self) -> SignContext {
        self.context
    }

    #[cfg(test)]
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn drain_events(&mut self) -> Vec<ScoreEvent> {
        self.bus.drain()
    }

    pub fn required_flags_hold(&self, snapshot: &TelemetrySnapshot) -> bool {
        snapshot.flags_set(&self.required_flags)
    }

    /// Run one evaluation cycle over an ordered detection batch.
    ///
    /// The only suspension point is the stop-sign dwell. If `shutdown` fires
    /// during it, the pending stop deduction and the post-detection rule are
    /// skipped; deductions already applied earlier in the batch stand.
    pub async fn run_cycle(
        &mut self,
        detections: &[DetectionEvent],
        shutdown: &mut ShutdownSignal,
    ) -> CycleReport {
        let started = Instant::now();
        self.cycle += 1;
        let cycle = self.cycle;
        let mut deductions = Vec::new();

        let s0 = self.telemetry.snapshot();

        if detections.is_empty() {
            if !self.required_flags_hold(&s0) {
                self.deduct(
                    cycle,
                    DeductionReason::NoDetections,
                    self.no_detection_penalty,
                    &mut deductions,
                );
            }
        } else {
            for detection in detections {
                if detection.confidence < self.detection_threshold {
                    self.metrics.inc(&self.metrics.detections_below_threshold);
                    continue;
                }

                let Some(class) = SignClass::from_id(detection.class_id) else {
                    debug!("Ignoring unknown class id {}", detection.class_id);
                    continue;
                };
                let Some(rule) = self.rules.get(class).cloned() else {
                    debug!("No rule for {}", class.label());
                    continue;
                };

                self.metrics.inc(&self.metrics.detections_considered);
                debug!(
                    "Cycle {}: {} ({:.2})",
                    cycle,
                    class.label(),
                    detection.confidence
                );

                match rule {
                    SignRule::SpeedLimit => {
                        let penalty = self.speed_table.penalty(s0.raw_speed());
                        self.deduct(cycle, DeductionReason::SpeedLimit, penalty, &mut deductions);
                    }

                    SignRule::EnterZone(zone) => {
                        self.context = SignContext::Zone(zone);
                    }

                    SignRule::FullStop => {
                        self.context = SignContext::Marker(class);
                        if !self.dwell(shutdown).await {
                            return self.abort(cycle, deductions);
                        }
                        let fresh = self.telemetry.snapshot();
                        if !self.required_flags_hold(&fresh) {
                            self.deduct(
                                cycle,
                                DeductionReason::StopSign,
                                self.stop_penalty,
                                &mut deductions,
                            );
                        }
                    }

                    SignRule::TurnOnly { requires } => {
                        let complied = requires
                            .iter()
                            .all(|(channel, expected)| s0.get(*channel) == *expected);
                        if !complied {
                            self.deduct(
                                cycle,
                                DeductionReason::TurnRestriction(class),
                                self.turn_penalty,
                                &mut deductions,
                            );
                        }
                        self.context = SignContext::Marker(class);
                    }

                    SignRule::Marker => {
                        self.context = SignContext::Marker(class);
                    }
                }
            }
        }

        let context = std::mem::take(&mut self.context);
        if let Some(zone) = context.zone() {
            let s1 = self.telemetry.snapshot();
            let (table, reason) = match zone {
                ZoneKind::School => (&self.school_table, DeductionReason::SchoolZone),
                ZoneKind::Construction => {
                    (&self.construction_table, DeductionReason::ConstructionZone)
                }
            };
            let penalty = table.penalty(s1.raw_speed());
            self.deduct(cycle, reason, penalty, &mut deductions);
        }

        self.metrics.inc(&self.metrics.cycles_completed);
        self.metrics
            .set_timing(&self.metrics.cycle_time_us, started.elapsed().as_micros() as u64);

        self.bus.publish(ScoreEvent::CycleCompleted {
            cycle,
            score: self.score,
            deductions: deductions.clone(),
            timestamp: Utc::now(),
        });

        CycleReport {
            cycle,
            outcome: CycleOutcome::Completed,
            deductions,
            score: self.score,
        }
    }

    /// Wait out the stop dwell. False if shutdown interrupted it.
    async fn dwell(&self, shutdown: &mut ShutdownSignal) -> bool {
        tokio::select! {
            biased;
            _ = shutdown.triggered() => false,
            _ = tokio::time::sleep(self.stop_dwell) => true,
        }
    }

    fn abort(&mut self, cycle: u64, deductions: Vec<Deduction>) -> CycleReport {
        self.context = SignContext::Idle;
        self.metrics.inc(&self.metrics.cycles_aborted);
        warn!(
            "Cycle {} aborted during stop dwell, pending deduction dropped",
            cycle
        );

        self.bus.publish(ScoreEvent::CycleAborted {
            cycle,
            score: self.score,
            timestamp: Utc::now(),
        });

        CycleReport {
            cycle,
            outcome: CycleOutcome::Aborted,
            deductions,
            score: self.score,
        }
    }

    fn deduct(
        &mut self,
        cycle: u64,
        reason: DeductionReason,
        amount: f64,
        deductions: &mut Vec<Deduction>,
    ) {
        if amount == 0.0 {
            return;
        }

        self.score -= amount;
        self.metrics.inc(&self.metrics.deductions_applied);
        info!("➖ {:?}: -{} (score {:.1})", reason, amount, self.score);

        deductions.push(Deduction { reason, amount });
        self.bus.publish(ScoreEvent::DeductionApplied {
            cycle,
            reason,
            amount,
            score: self.score,
        });
    }
}
