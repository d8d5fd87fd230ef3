// src/pipeline/scheduler.rs
//
// Evaluation cadence. Detection and scoring run only on every Nth
// captured frame, starting with the first one.

use tracing::debug;

pub struct CycleScheduler {
    interval: u64,
    frames_seen: u64,
    cycles_scheduled: u64,
}

impl CycleScheduler {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            frames_seen: 0,
            cycles_scheduled: 0,
        }
    }

    /// Count one captured frame and decide whether it gets a cycle.
    pub fn should_evaluate(&mut self) -> bool {
        let due = self.frames_seen % self.interval == 0;
        self.frames_seen += 1;

        if due {
            self.cycles_scheduled += 1;
            debug!(
                "Cycle scheduled on frame {} (every {} frames)",
                self.frames_seen - 1,
                self.interval
            );
        }

        due
    }

    pub fn get_stats(&self) -> SchedulerStats {
        SchedulerStats {
            frames_seen: self.frames_seen,
            cycles_scheduled: self.cycles_scheduled,
            evaluation_frequency: if self.frames_seen > 0 {
                self.cycles_scheduled as f32 / self.frames_seen as f32
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerStats {
    pub frames_seen: u64,
    pub cycles_scheduled: u64,
    pub evaluation_frequency: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tenth_frame_from_zero() {
        let mut scheduler = CycleScheduler::new(10);
        let scheduled: Vec<u64> = (0..25u64)
            .filter(|_| scheduler.should_evaluate())
            .collect();
        assert_eq!(scheduled, vec![0, 10, 20]);

        let stats = scheduler.get_stats();
        assert_eq!(stats.frames_seen, 25);
        assert_eq!(stats.cycles_scheduled, 3);
    }

    #[test]
    fn test_interval_one_evaluates_every_frame() {
        let mut scheduler = CycleScheduler::new(1);
        assert!((0..5).all(|_| scheduler.should_evaluate()));
        assert_eq!(scheduler.get_stats().evaluation_frequency, 1.0);
    }
}
