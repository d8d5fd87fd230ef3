// src/pipeline/sink.rs
//
// Observability sinks. Fire-and-forget: a failing sink is logged by the
// orchestrator and never feeds back into scoring.

use super::event_bus::ScoreEvent;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub trait ScoreSink: Send {
    fn publish(&mut self, event: &ScoreEvent) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes the running score to the log, once per cycle.
pub struct TracingSink;

impl ScoreSink for TracingSink {
    fn publish(&mut self, event: &ScoreEvent) -> Result<()> {
        match event {
            ScoreEvent::CycleCompleted { score, .. } => info!("Score: {:.1}", score),
            ScoreEvent::CycleAborted { cycle, score, .. } => {
                warn!("Score: {:.1} (cycle {} aborted)", score, cycle)
            }
            ScoreEvent::SessionEnded(summary) => info!(
                "🏁 Session {} ended: score {:.1} after {} cycles",
                summary.session_id, summary.final_score, summary.cycles_completed
            ),
            ScoreEvent::DeductionApplied { .. } => {}
        }
        Ok(())
    }
}

/// Appends every event as one JSON line.
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir failed: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open score log failed: {}", path.display()))?;

        info!("✓ Score log: {}", path.display());
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }
}

impl ScoreSink for JsonlSink {
    fn publish(&mut self, event: &ScoreEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(self.writer, "{}", line)
            .with_context(|| format!("write failed: {}", self.path.display()))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("flush failed: {}", self.path.display()))
    }
}
