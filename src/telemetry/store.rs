// src/telemetry/store.rs
//
// Latest value per telemetry channel. Writers (the MQTT listener) and the
// single engine reader never take a lock: each channel is its own atomic
// cell, so a reader racing a writer sees either the old or the new value.
// No cross-channel consistency is promised.

use super::channel::Channel;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("non-numeric payload for {channel}: {payload:?}")]
pub struct TelemetryParseError {
    pub channel: Channel,
    pub payload: String,
}

#[derive(Debug)]
pub struct TelemetryStore {
    values: [AtomicI64; 8],
}

impl TelemetryStore {
    /// Every channel reads 0 until its first update.
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|_| AtomicI64::new(0)),
        }
    }

    /// Parse a raw payload and store it. A payload that is not an integer
    /// leaves the previous value in place.
    pub fn update(&self, channel: Channel, raw: &[u8]) -> Result<i64, TelemetryParseError> {
        let text = String::from_utf8_lossy(raw);
        let value = text
            .trim()
            .parse::<i64>()
            .map_err(|_| TelemetryParseError {
                channel,
                payload: text.to_string(),
            })?;
        self.set(channel, value);
        Ok(value)
    }

    pub fn set(&self, channel: Channel, value: i64) {
        self.values[channel.index()].store(value, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub fn get(&self, channel: Channel) -> i64 {
        self.values[channel.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            values: std::array::from_fn(|i| self.values[i].load(Ordering::Relaxed)),
        }
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable copy of all eight channels at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TelemetrySnapshot {
    values: [i64; 8],
}

impl TelemetrySnapshot {
    pub fn get(&self, channel: Channel) -> i64 {
        self.values[channel.index()]
    }

    #[cfg(test)]
    pub fn with(mut self, channel: Channel, value: i64) -> Self {
        self.values[channel.index()] = value;
        self
    }

    pub fn raw_speed(&self) -> i64 {
        self.get(Channel::V1)
    }

    /// True when every listed channel reads exactly 1.
    pub fn flags_set(&self, channels: &[Channel]) -> bool {
        channels.iter().all(|channel| self.get(*channel) == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const REQUIRED: [Channel; 4] = [Channel::V3, Channel::V4, Channel::V5, Channel::V6];

    #[test]
    fn test_missing_channels_read_zero() {
        let store = TelemetryStore::new();
        let snapshot = store.snapshot();
        for channel in Channel::ALL {
            assert_eq!(snapshot.get(channel), 0);
        }
    }

    #[test]
    fn test_last_write_wins() {
        let store = TelemetryStore::new();
        assert_eq!(store.update(Channel::V1, b"170"), Ok(170));
        assert_eq!(store.update(Channel::V1, b" 195\n"), Ok(195));
        assert_eq!(store.get(Channel::V1), 195);
        assert_eq!(store.snapshot().raw_speed(), 195);
    }

    #[test]
    fn test_malformed_payload_keeps_previous_value() {
        let store = TelemetryStore::new();
        store.update(Channel::V3, b"1").unwrap();

        let err = store.update(Channel::V3, b"on").unwrap_err();
        assert_eq!(err.channel, Channel::V3);
        assert_eq!(err.payload, "on");
        assert_eq!(store.get(Channel::V3), 1);

        assert!(store.update(Channel::V3, b"").is_err());
        assert!(store.update(Channel::V3, b"1.5").is_err());
        assert_eq!(store.get(Channel::V3), 1);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = TelemetryStore::new();
        store.set(Channel::V8, 4);
        let before = store.snapshot();
        store.set(Channel::V8, 3);
        assert_eq!(before.get(Channel::V8), 4);
        assert_eq!(store.snapshot().get(Channel::V8), 3);
    }

    #[test]
    fn test_required_flags_need_all_four() {
        let all_on = REQUIRED
            .iter()
            .fold(TelemetrySnapshot::default(), |s, c| s.with(*c, 1));
        assert!(all_on.flags_set(&REQUIRED));

        for off in REQUIRED {
            let snapshot = all_on.with(off, 0);
            assert!(
                !snapshot.flags_set(&REQUIRED),
                "{} at 0 must fail the predicate",
                off
            );
        }

        // A flag must be exactly 1, not merely non-zero
        assert!(!all_on.with(Channel::V5, 2).flags_set(&REQUIRED));
    }

    #[test]
    fn test_concurrent_writers_on_different_channels() {
        let store = Arc::new(TelemetryStore::new());
        let handles: Vec<_> = Channel::ALL
            .into_iter()
            .map(|channel| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for v in 0..1000 {
                        store.set(channel, v);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        for channel in Channel::ALL {
            assert_eq!(store.get(channel), 999);
        }
    }
}
