// src/adapters/vision.rs
//
// Vision collaborator seam. The detector itself lives outside this crate;
// what reaches the engine is one ordered detection list per frame.

use crate::types::{DetectionEvent, SourceFrame};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::info;
use walkdir::WalkDir;

#[allow(async_fn_in_trait)]
pub trait DetectionSource {
    /// Next captured frame with its detections, or `None` when the source
    /// is finished. Must be cancel-safe.
    async fn next_frame(&mut self) -> Result<Option<SourceFrame>>;
}

/// Frames pushed by an in-process detector.
pub struct ChannelSource {
    rx: mpsc::Receiver<SourceFrame>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<SourceFrame>) -> Self {
        Self { rx }
    }
}

impl DetectionSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
        Ok(self.rx.recv().await)
    }
}

/// One line of a detection log.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    #[serde(default)]
    frame_id: Option<u64>,
    #[serde(default)]
    detections: Vec<DetectionEvent>,
}

/// Replays recorded detector output (`*.jsonl`, one frame per line) at the
/// capture frame rate.
pub struct ReplaySource {
    files: VecDeque<PathBuf>,
    pending: VecDeque<SourceFrame>,
    frame_period: Duration,
    ticker: Option<Interval>,
    next_frame_id: u64,
}

impl ReplaySource {
    pub fn discover(dir: &str, target_fps: u32) -> Result<Self> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("jsonl") {
                files.push(path.to_path_buf());
            }
        }
        files.sort();

        info!("Found {} detection log(s) in {}", files.len(), dir);
        Ok(Self::from_files(files, target_fps))
    }

    pub fn from_files(files: Vec<PathBuf>, target_fps: u32) -> Self {
        Self {
            files: files.into(),
            pending: VecDeque::new(),
            frame_period: Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1))),
            ticker: None,
            next_frame_id: 0,
        }
    }

    #[cfg(test)]
    pub fn remaining_files(&self) -> usize {
        self.files.len()
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        info!("Replaying detections: {}", path.display());
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read detection log failed: {}", path.display()))?;

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: ReplayRecord = serde_json::from_str(line).with_context(|| {
                format!("bad record at {}:{}", path.display(), line_no + 1)
            })?;
            let frame_id = record.frame_id.unwrap_or(self.next_frame_id);
            self.next_frame_id = frame_id.saturating_add(1);
            self.pending.push_back(SourceFrame {
                frame_id,
                detections: record.detections,
            });
        }

        Ok(())
    }
}

impl DetectionSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
        while self.pending.is_empty() {
            let Some(path) = self.files.pop_front() else {
                return Ok(None);
            };
            self.load_file(&path)?;
        }

        let period = self.frame_period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;

        Ok(self.pending.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_log(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_reads_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "b.jsonl",
            r#"{"detections": [{"class_id": 3, "confidence": 0.95}]}"#,
        );
        write_log(
            dir.path(),
            "a.jsonl",
            concat!(
                r#"{"frame_id": 0, "detections": []}"#,
                "\n\n",
                r#"{"frame_id": 1, "detections": [{"bbox": [1, 2, 3, 4], "#,
                r#""class_id": 0, "confidence": 0.9}]}"#,
                "\n"
            ),
        );
        write_log(dir.path(), "notes.txt", "ignored");

        let mut source = ReplaySource::discover(dir.path().to_str().unwrap(), 30).unwrap();
        assert_eq!(source.remaining_files(), 2);

        let first = source.next_frame().await.unwrap().unwrap();
        assert_eq!(first.frame_id, 0);
        assert!(first.detections.is_empty());

        let second = source.next_frame().await.unwrap().unwrap();
        assert_eq!(second.detections[0].bbox, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(second.detections[0].class_id, 0);

        // Missing frame_id continues the sequence
        let third = source.next_frame().await.unwrap().unwrap();
        assert_eq!(third.frame_id, 2);
        assert_eq!(third.detections[0].class_id, 3);

        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replay_reports_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(dir.path(), "bad.jsonl", "{not json}\n");

        let mut source = ReplaySource::from_files(vec![path], 30);
        let err = source.next_frame().await.unwrap_err();
        assert!(format!("{:#}", err).contains("bad.jsonl:1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_frame_id_at_u64_max() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(
            dir.path(),
            "edge.jsonl",
            concat!(
                r#"{"frame_id": 18446744073709551615, "detections": []}"#,
                "\n",
                r#"{"detections": []}"#,
                "\n"
            ),
        );

        let mut source = ReplaySource::from_files(vec![path], 30);
        let first = source.next_frame().await.unwrap().unwrap();
        assert_eq!(first.frame_id, u64::MAX);
        let second = source.next_frame().await.unwrap().unwrap();
        assert_eq!(second.frame_id, u64::MAX);
    }

    #[tokio::test]
    async fn test_channel_source_ends_when_sender_drops() {
        let (tx, rx) = mpsc::channel(4);
        let mut source = ChannelSource::new(rx);
        tx.send(SourceFrame::default()).await.unwrap();
        drop(tx);

        assert!(source.next_frame().await.unwrap().is_some());
        assert!(source.next_frame().await.unwrap().is_none());
    }
}
