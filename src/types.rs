// src/types.rs

use crate::scoring::penalty::SpeedBand;
use crate::telemetry::Channel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub telemetry: TelemetryConfig,
    pub vision: VisionConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub initial_score: f64,
    pub detection_threshold: f32,
    pub stop_dwell_ms: u64,
    /// Raw speed encoding offset: actual = raw - speed_offset
    pub speed_offset: i64,
    pub speed_bands: Vec<SpeedBand>,
    pub school_bands: Vec<SpeedBand>,
    pub construction_bands: Vec<SpeedBand>,
    pub required_flag_channels: Vec<Channel>,
    pub no_detection_penalty: f64,
    pub stop_penalty: f64,
    pub turn_penalty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// Topic for a channel is `topic_prefix` + channel name, e.g. `esp32/v1`
    pub topic_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub replay_dir: String,
    pub target_fps: u32,
    pub frame_skip_interval: u64,
    pub class_names: HashMap<u16, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub jsonl_path: Option<String>,
    pub max_pending_events: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

/// One detected object as reported by the vision collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// [x1, y1, x2, y2], display only
    #[serde(default)]
    pub bbox: [f32; 4],
    pub class_id: u16,
    pub confidence: f32,
}

impl DetectionEvent {
    #[cfg(test)]
    pub fn new(class_id: u16, confidence: f32) -> Self {
        Self {
            bbox: [0.0; 4],
            class_id,
            confidence,
        }
    }
}

/// Everything the vision collaborator produced for one captured frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFrame {
    pub frame_id: u64,
    pub detections: Vec<DetectionEvent>,
}
