// src/scoring/sign.rs
//
// Sign classes produced by the detector and the single-slot context that
// carries a sign from the per-detection phase to the post-detection phase
// of the same evaluation cycle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignClass {
    SpeedLimit,
    SchoolZone,
    ConstructionZone,
    StopSign,
    Yield,
    LeftTurnOnly,
    RightTurnOnly,
    PedestrianCrossing,
}

impl SignClass {
    pub const ALL: [SignClass; 8] = [
        SignClass::SpeedLimit,
        SignClass::SchoolZone,
        SignClass::ConstructionZone,
        SignClass::StopSign,
        SignClass::Yield,
        SignClass::LeftTurnOnly,
        SignClass::RightTurnOnly,
        SignClass::PedestrianCrossing,
    ];

    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    #[cfg(test)]
    pub fn id(self) -> u16 {
        match self {
            SignClass::SpeedLimit => 0,
            SignClass::SchoolZone => 1,
            SignClass::ConstructionZone => 2,
            SignClass::StopSign => 3,
            SignClass::Yield => 4,
            SignClass::LeftTurnOnly => 5,
            SignClass::RightTurnOnly => 6,
            SignClass::PedestrianCrossing => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SignClass::SpeedLimit => "speed-limit",
            SignClass::SchoolZone => "school-zone",
            SignClass::ConstructionZone => "construction-zone",
            SignClass::StopSign => "stop-sign",
            SignClass::Yield => "yield",
            SignClass::LeftTurnOnly => "left-turn-only",
            SignClass::RightTurnOnly => "right-turn-only",
            SignClass::PedestrianCrossing => "pedestrian-crossing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    School,
    Construction,
}

/// Lives for one cycle only: armed while detections are processed, read
/// by the post-detection rule, then cleared. Every sign except the
/// speed-limit sign overwrites the slot, so a later sign in the same batch
/// supersedes an earlier zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SignContext {
    #[default]
    Idle,
    /// Has a post-detection speed rule
    Zone(ZoneKind),
    /// Seen this cycle, no post-detection rule
    Marker(SignClass),
}

impl SignContext {
    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        matches!(self, SignContext::Idle)
    }

    pub fn zone(&self) -> Option<ZoneKind> {
        match self {
            SignContext::Zone(zone) => Some(*zone),
            _ => None,
        }
    }
}

/// Display labels, with optional overrides from the detector's own names.
#[derive(Debug, Clone, Default)]
pub struct ClassLabels {
    overrides: HashMap<u16, String>,
}

impl ClassLabels {
    pub fn new(overrides: HashMap<u16, String>) -> Self {
        Self { overrides }
    }

    pub fn label(&self, class_id: u16) -> String {
        if let Some(name) = self.overrides.get(&class_id) {
            return name.clone();
        }
        SignClass::from_id(class_id)
            .map(|class| class.label().to_string())
            .unwrap_or_else(|| format!("class-{}", class_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_ids_round_trip() {
        for class in SignClass::ALL {
            assert_eq!(SignClass::from_id(class.id()), Some(class));
        }
        assert_eq!(SignClass::from_id(8), None);
    }

    #[test]
    fn test_context_defaults_to_idle() {
        let ctx = SignContext::default();
        assert!(ctx.is_idle());
        assert_eq!(ctx.zone(), None);
        assert_eq!(
            SignContext::Zone(ZoneKind::School).zone(),
            Some(ZoneKind::School)
        );
        assert_eq!(SignContext::Marker(SignClass::Yield).zone(), None);
    }

    #[test]
    fn test_labels_prefer_overrides() {
        let labels = ClassLabels::new(HashMap::from([(3, "STOP".to_string())]));
        assert_eq!(labels.label(3), "STOP");
        assert_eq!(labels.label(1), "school-zone");
        assert_eq!(labels.label(42), "class-42");
    }
}
