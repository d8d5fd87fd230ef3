// src/pipeline/event_bus.rs
//
// Decoupled score events. The engine publishes, the orchestrator drains
// to the observability sinks after every cycle.

use crate::scoring::{Deduction, DeductionReason};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::warn;

use super::orchestrator::SessionSummary;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScoreEvent {
    DeductionApplied {
        cycle: u64,
        reason: DeductionReason,
        amount: f64,
        score: f64,
    },

    CycleCompleted {
        cycle: u64,
        score: f64,
        deductions: Vec<Deduction>,
        timestamp: DateTime<Utc>,
    },

    CycleAborted {
        cycle: u64,
        score: f64,
        timestamp: DateTime<Utc>,
    },

    SessionEnded(SessionSummary),
}

pub struct EventBus {
    events: VecDeque<ScoreEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, event: ScoreEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "Event bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<ScoreEvent> {
        self.events.drain(..).collect()
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}
