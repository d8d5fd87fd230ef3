// src/pipeline/mod.rs

pub mod event_bus;
pub mod metrics;
pub mod orchestrator;
pub mod scheduler;
pub mod shutdown;
pub mod sink;

pub use event_bus::ScoreEvent;
pub use metrics::ScoringMetrics;
pub use orchestrator::PipelineOrchestrator;
pub use shutdown::{shutdown_channel, ShutdownTrigger};
pub use sink::{JsonlSink, ScoreSink, TracingSink};
