// src/config.rs

use crate::scoring::penalty::{
    default_construction_bands, default_school_bands, default_speed_bands, SpeedBand,
    DEFAULT_SPEED_OFFSET,
};
use crate::telemetry::Channel;
use crate::types::{
    Config, LoggingConfig, OutputConfig, ScoringConfig, TelemetryConfig, VisionConfig,
};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("detection_threshold must be within [0, 1], got {0}")]
    Threshold(f32),

    #[error("frame_skip_interval must be at least 1")]
    FrameSkipInterval,

    #[error("target_fps must be at least 1")]
    TargetFps,

    #[error("{table}: band {min}..={max} has max below min")]
    InvertedBand {
        table: &'static str,
        min: i64,
        max: i64,
    },

    #[error("keep_alive_secs must be at least 5, got {0}")]
    KeepAlive(u64),

    #[error("topic_prefix must not contain MQTT wildcards, got {0:?}")]
    TopicPrefix(String),
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read config failed: {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parse yaml failed: {}", path))?;
        config
            .validate()
            .with_context(|| format!("invalid config: {}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.scoring.detection_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Threshold(threshold));
        }
        if self.vision.frame_skip_interval == 0 {
            return Err(ConfigError::FrameSkipInterval);
        }
        if self.vision.target_fps == 0 {
            return Err(ConfigError::TargetFps);
        }
        if self.telemetry.keep_alive_secs < 5 {
            return Err(ConfigError::KeepAlive(self.telemetry.keep_alive_secs));
        }
        let prefix = &self.telemetry.topic_prefix;
        if prefix.contains(['#', '+']) {
            return Err(ConfigError::TopicPrefix(prefix.clone()));
        }

        let tables: [(&'static str, &[SpeedBand]); 3] = [
            ("speed_bands", &self.scoring.speed_bands),
            ("school_bands", &self.scoring.school_bands),
            ("construction_bands", &self.scoring.construction_bands),
        ];
        for (table, bands) in tables {
            for band in bands {
                if let Some(max) = band.max {
                    if max < band.min {
                        return Err(ConfigError::InvertedBand {
                            table,
                            min: band.min,
                            max,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            initial_score: 100.0,
            detection_threshold: 0.8,
            stop_dwell_ms: 10_000,
            speed_offset: DEFAULT_SPEED_OFFSET,
            speed_bands: default_speed_bands(),
            school_bands: default_school_bands(),
            construction_bands: default_construction_bands(),
            required_flag_channels: vec![Channel::V3, Channel::V4, Channel::V5, Channel::V6],
            no_detection_penalty: 0.4,
            stop_penalty: 5.0,
            turn_penalty: 0.5,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            broker_host: "mqtt.eclipseprojects.io".to_string(),
            broker_port: 1883,
            client_id: "smartdrive-score".to_string(),
            keep_alive_secs: 60,
            topic_prefix: "esp32/".to_string(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            replay_dir: "replays".to_string(),
            target_fps: 30,
            frame_skip_interval: 10,
            class_names: HashMap::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jsonl_path: None,
            max_pending_events: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scoring.initial_score, 100.0);
        assert_eq!(config.scoring.stop_dwell_ms, 10_000);
        assert_eq!(config.vision.frame_skip_interval, 10);
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let yaml = r#"
scoring:
  detection_threshold: 0.6
  required_flag_channels: [v3, v6]
vision:
  frame_skip_interval: 5
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.scoring.detection_threshold, 0.6);
        assert_eq!(
            config.scoring.required_flag_channels,
            vec![Channel::V3, Channel::V6]
        );
        assert_eq!(config.scoring.stop_penalty, 5.0);
        assert_eq!(config.scoring.speed_bands, default_speed_bands());
        assert_eq!(config.vision.frame_skip_interval, 5);
        assert_eq!(config.telemetry.topic_prefix, "esp32/");
    }

    #[test]
    fn test_band_tables_parse_open_ended_max() {
        let yaml = r#"
scoring:
  speed_bands:
    - { min: 10, max: 20, penalty: 1.0 }
    - { min: 21, penalty: 3.0 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.scoring.speed_bands[1].max, None);
        assert_eq!(config.scoring.speed_bands[1].penalty, 3.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scoring.detection_threshold = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::Threshold(1.5)));

        let mut config = Config::default();
        config.vision.frame_skip_interval = 0;
        assert_eq!(config.validate(), Err(ConfigError::FrameSkipInterval));

        for prefix in ["esp32/#/", "car/+/"] {
            let mut config = Config::default();
            config.telemetry.topic_prefix = prefix.to_string();
            assert_eq!(
                config.validate(),
                Err(ConfigError::TopicPrefix(prefix.to_string()))
            );
        }

        let mut config = Config::default();
        config.scoring.school_bands = vec![SpeedBand::new(50, Some(10), 0.2)];
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedBand {
                table: "school_bands",
                min: 50,
                max: 10
            })
        );
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "logging:\n  level: debug\n").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.logging.level, "debug");

        let missing = dir.path().join("missing.yaml");
        assert!(Config::load(missing.to_str().unwrap()).is_err());
    }
}
