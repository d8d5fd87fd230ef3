// src/scoring/penalty.rs
//
// Banded speed penalties. The same lookup serves the speed-limit rule and
// the two zone post-rules, each with its own table.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SPEED_OFFSET: i64 = 100;

/// Inclusive speed range mapped to a deduction. `max: None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBand {
    pub min: i64,
    #[serde(default)]
    pub max: Option<i64>,
    pub penalty: f64,
}

impl SpeedBand {
    pub const fn new(min: i64, max: Option<i64>, penalty: f64) -> Self {
        Self { min, max, penalty }
    }

    pub fn contains(&self, speed: i64) -> bool {
        speed >= self.min && self.max.map_or(true, |max| speed <= max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    bands: Vec<SpeedBand>,
    offset: i64,
}

impl BandTable {
    pub fn new(bands: Vec<SpeedBand>, offset: i64) -> Self {
        Self { bands, offset }
    }

    #[cfg(test)]
    pub fn speed_limit() -> Self {
        Self::new(default_speed_bands(), DEFAULT_SPEED_OFFSET)
    }

    #[cfg(test)]
    pub fn school_zone() -> Self {
        Self::new(default_school_bands(), DEFAULT_SPEED_OFFSET)
    }

    #[cfg(test)]
    pub fn construction_zone() -> Self {
        Self::new(default_construction_bands(), DEFAULT_SPEED_OFFSET)
    }

    pub fn actual_speed(&self, raw_speed: i64) -> i64 {
        raw_speed - self.offset
    }

    /// Deduction for a raw speed sample. First matching band wins;
    /// speeds outside every band cost nothing.
    pub fn penalty(&self, raw_speed: i64) -> f64 {
        let actual = self.actual_speed(raw_speed);
        self.bands
            .iter()
            .find(|band| band.contains(actual))
            .map_or(0.0, |band| band.penalty)
    }
}

pub fn default_speed_bands() -> Vec<SpeedBand> {
    vec![
        SpeedBand::new(40, Some(80), 0.2),
        SpeedBand::new(81, Some(150), 0.8),
        SpeedBand::new(151, None, 2.0),
    ]
}

/// School zone: compliant at or below 60
pub fn default_school_bands() -> Vec<SpeedBand> {
    vec![
        SpeedBand::new(61, Some(100), 0.2),
        SpeedBand::new(101, Some(150), 0.5),
    ]
}

/// Construction zone: compliant at or below 40
pub fn default_construction_bands() -> Vec<SpeedBand> {
    vec![
        SpeedBand::new(41, Some(70), 0.2),
        SpeedBand::new(71, Some(110), 0.4),
        SpeedBand::new(111, Some(150), 0.8),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_limit_bands() {
        let table = BandTable::speed_limit();

        for raw in [0, 50, 100, 120, 139] {
            assert_eq!(table.penalty(raw), 0.0, "raw {}", raw);
        }
        for raw in [140, 160, 180] {
            assert_eq!(table.penalty(raw), 0.2, "raw {}", raw);
        }
        for raw in [181, 200, 250] {
            assert_eq!(table.penalty(raw), 0.8, "raw {}", raw);
        }
        for raw in [251, 255, 10_000] {
            assert_eq!(table.penalty(raw), 2.0, "raw {}", raw);
        }
    }

    #[test]
    fn test_negative_actual_speed_costs_nothing() {
        assert_eq!(BandTable::speed_limit().penalty(-50), 0.0);
    }

    #[test]
    fn test_school_zone_bands() {
        let table = BandTable::school_zone();
        assert_eq!(table.penalty(160), 0.0); // 60, compliant
        assert_eq!(table.penalty(161), 0.2);
        assert_eq!(table.penalty(195), 0.2);
        assert_eq!(table.penalty(200), 0.2);
        assert_eq!(table.penalty(201), 0.5);
        assert_eq!(table.penalty(250), 0.5);
        assert_eq!(table.penalty(251), 0.0);
    }

    #[test]
    fn test_construction_zone_bands() {
        let table = BandTable::construction_zone();
        assert_eq!(table.penalty(140), 0.0);
        assert_eq!(table.penalty(141), 0.2);
        assert_eq!(table.penalty(170), 0.2);
        assert_eq!(table.penalty(171), 0.4);
        assert_eq!(table.penalty(210), 0.4);
        assert_eq!(table.penalty(211), 0.8);
        assert_eq!(table.penalty(250), 0.8);
        assert_eq!(table.penalty(251), 0.0);
    }

    #[test]
    fn test_custom_table_and_offset() {
        let table = BandTable::new(vec![SpeedBand::new(0, Some(9), 1.5)], 0);
        assert_eq!(table.penalty(5), 1.5);
        assert_eq!(table.penalty(10), 0.0);
        assert_eq!(table.actual_speed(5), 5);
    }
}
