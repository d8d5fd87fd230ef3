// src/main.rs

mod adapters;
mod config;
mod pipeline;
mod scoring;
mod telemetry;
mod types;

use adapters::{ReplaySource, TelemetryListener};
use anyhow::Result;
use pipeline::{
    shutdown_channel, JsonlSink, PipelineOrchestrator, ScoreSink, ScoringMetrics, ShutdownTrigger,
    TracingSink,
};
use scoring::{ClassLabels, ScoringEngine};
use std::path::Path;
use std::sync::Arc;
use telemetry::TelemetryStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("SMARTDRIVE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config_found = Path::new(&config_path).exists();
    let config = if config_found {
        types::Config::load(&config_path)?
    } else {
        types::Config::default()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "smartdrive_score={},rumqttc=warn",
            config.logging.level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚗 SmartDrive compliance scoring starting");
    if config_found {
        info!("✓ Configuration loaded from {}", config_path);
    } else {
        warn!("{} not found, using built-in defaults", config_path);
    }
    info!(
        "Scoring: start={:.1}, threshold={:.2}, stop dwell={}ms, every {} frames",
        config.scoring.initial_score,
        config.scoring.detection_threshold,
        config.scoring.stop_dwell_ms,
        config.vision.frame_skip_interval
    );

    let store = Arc::new(TelemetryStore::new());
    let metrics = ScoringMetrics::new();
    let (trigger, shutdown) = shutdown_channel();
    let trigger = Arc::new(trigger);
    spawn_signal_handlers(Arc::clone(&trigger));

    let listener = TelemetryListener::new(
        config.telemetry.clone(),
        Arc::clone(&store),
        metrics.clone(),
    );
    let listener_handle = tokio::spawn(listener.run(shutdown.clone()));

    let engine = ScoringEngine::new(
        &config.scoring,
        Arc::clone(&store),
        metrics.clone(),
        config.output.max_pending_events,
    );
    info!("✓ Scoring engine ready");

    let source = ReplaySource::discover(&config.vision.replay_dir, config.vision.target_fps)?;

    let mut sinks: Vec<Box<dyn ScoreSink>> = vec![Box::new(TracingSink)];
    if let Some(path) = &config.output.jsonl_path {
        sinks.push(Box::new(JsonlSink::create(path)?));
    }

    let orchestrator = PipelineOrchestrator::new(
        engine,
        source,
        config.vision.frame_skip_interval,
        metrics.clone(),
    )
    .with_sinks(sinks)
    .with_labels(
        ClassLabels::new(config.vision.class_names.clone()),
        config.scoring.detection_threshold,
    );

    let summary = orchestrator.run(shutdown).await?;

    // Source finished on its own: release the telemetry listener too
    trigger.trigger();
    match listener_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Telemetry listener failed: {:#}", e),
        Err(e) => warn!("Telemetry listener task panicked: {}", e),
    }

    let stats = metrics.summary();
    info!("\n========================================");
    info!("  Final score: {:.1}", summary.final_score);
    info!("  Frames seen: {}", summary.frames_seen);
    info!(
        "  Cycles: {} completed, {} aborted",
        summary.cycles_completed, summary.cycles_aborted
    );
    info!("  Deductions applied: {}", summary.deductions_applied);
    info!(
        "  Detections: {} scored, {} below threshold",
        stats.detections_considered, stats.detections_below_threshold
    );
    if summary.telemetry_rejected > 0 {
        warn!(
            "  ⚠️  Telemetry payloads rejected: {}",
            summary.telemetry_rejected
        );
    }
    info!("  Telemetry payloads accepted: {}", summary.telemetry_accepted);
    info!("========================================");

    Ok(())
}

fn spawn_signal_handlers(trigger: Arc<ShutdownTrigger>) {
    let ctrl_c = Arc::clone(&trigger);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT, shutting down");
            ctrl_c.trigger();
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, shutting down");
                trigger.trigger();
            }
            Err(e) => warn!("SIGTERM handler unavailable: {}", e),
        }
    });
}
