// src/scoring/rules.rs
//
// Per-detection rules keyed by sign class. Adding a sign is a table
// entry, not a new branch in the engine.

use super::sign::{SignClass, ZoneKind};
use crate::telemetry::Channel;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum SignRule {
    /// Deduct from the speed band table using the cycle snapshot
    SpeedLimit,

    /// Arm the zone for the post-detection rule; no immediate deduction
    EnterZone(ZoneKind),

    /// Hold the cycle for the stop dwell, then re-check required flags
    /// against fresh telemetry
    FullStop,

    /// Deduct the turn penalty unless every channel reads its expected value
    TurnOnly { requires: Vec<(Channel, i64)> },

    /// Recorded in the slot only, no scoring effect
    Marker,
}

#[derive(Debug, Clone)]
pub struct RuleBook {
    rules: HashMap<SignClass, SignRule>,
}

impl RuleBook {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut book = Self::empty();
        book.insert(SignClass::SpeedLimit, SignRule::SpeedLimit);
        book.insert(SignClass::SchoolZone, SignRule::EnterZone(ZoneKind::School));
        book.insert(
            SignClass::ConstructionZone,
            SignRule::EnterZone(ZoneKind::Construction),
        );
        book.insert(SignClass::StopSign, SignRule::FullStop);
        book.insert(SignClass::Yield, SignRule::Marker);
        book.insert(
            SignClass::LeftTurnOnly,
            SignRule::TurnOnly {
                requires: vec![(Channel::V8, 4), (Channel::V2, 1)],
            },
        );
        book.insert(
            SignClass::RightTurnOnly,
            SignRule::TurnOnly {
                requires: vec![(Channel::V8, 3), (Channel::V3, 1)],
            },
        );
        book.insert(SignClass::PedestrianCrossing, SignRule::Marker);
        book
    }

    pub fn insert(&mut self, class: SignClass, rule: SignRule) -> Option<SignRule> {
        self.rules.insert(class, rule)
    }

    pub fn get(&self, class: SignClass) -> Option<&SignRule> {
        self.rules.get(&class)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_book_covers_every_class() {
        let book = RuleBook::standard();
        assert_eq!(book.len(), SignClass::ALL.len());
        for class in SignClass::ALL {
            assert!(book.get(class).is_some(), "{:?} has no rule", class);
        }
    }

    #[test]
    fn test_insert_replaces_rule() {
        let mut book = RuleBook::standard();
        let previous = book.insert(
            SignClass::Yield,
            SignRule::TurnOnly {
                requires: vec![(Channel::V7, 1)],
            },
        );
        assert_eq!(previous, Some(SignRule::Marker));
        assert!(matches!(
            book.get(SignClass::Yield),
            Some(SignRule::TurnOnly { .. })
        ));
    }
}
