// src/adapters/mod.rs

pub mod mqtt;
pub mod vision;

pub use mqtt::TelemetryListener;
pub use vision::ReplaySource;
