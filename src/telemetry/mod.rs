// src/telemetry/mod.rs

pub mod channel;
pub mod store;

pub use channel::Channel;
pub use store::{TelemetrySnapshot, TelemetryStore};
