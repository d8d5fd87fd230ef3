// src/telemetry/channel.rs
//
// The eight named controller channels. v1 carries the raw speed
// encoding, the rest are flags and modes published by the onboard
// controller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Raw speed, actual = raw - 100
    V1,
    /// Left indicator / sensor flag
    V2,
    /// Right indicator / sensor flag
    V3,
    V4,
    V5,
    V6,
    V7,
    /// Turn mode (3 = right, 4 = left)
    V8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown telemetry channel: {0}")]
pub struct UnknownChannel(pub String);

impl Channel {
    pub const ALL: [Channel; 8] = [
        Channel::V1,
        Channel::V2,
        Channel::V3,
        Channel::V4,
        Channel::V5,
        Channel::V6,
        Channel::V7,
        Channel::V8,
    ];

    pub fn index(self) -> usize {
        match self {
            Channel::V1 => 0,
            Channel::V2 => 1,
            Channel::V3 => 2,
            Channel::V4 => 3,
            Channel::V5 => 4,
            Channel::V6 => 5,
            Channel::V7 => 6,
            Channel::V8 => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::V1 => "v1",
            Channel::V2 => "v2",
            Channel::V3 => "v3",
            Channel::V4 => "v4",
            Channel::V5 => "v5",
            Channel::V6 => "v6",
            Channel::V7 => "v7",
            Channel::V8 => "v8",
        }
    }

    pub fn topic(self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name())
    }

    /// Resolve an inbound MQTT topic back to its channel.
    pub fn from_topic(topic: &str, prefix: &str) -> Option<Channel> {
        topic
            .strip_prefix(prefix)
            .and_then(|name| name.parse().ok())
    }
}

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_round_trip_for_every_channel() {
        for channel in Channel::ALL {
            let topic = channel.topic("esp32/");
            assert_eq!(Channel::from_topic(&topic, "esp32/"), Some(channel));
        }
    }

    #[test]
    fn test_foreign_topics_are_rejected() {
        assert_eq!(Channel::from_topic("esp32/v9", "esp32/"), None);
        assert_eq!(Channel::from_topic("other/v1", "esp32/"), None);
        assert_eq!(Channel::from_topic("v1", "esp32/"), None);
        assert_eq!(
            "speed".parse::<Channel>(),
            Err(UnknownChannel("speed".to_string()))
        );
    }

    #[test]
    fn test_indices_are_dense() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }
}
