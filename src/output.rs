//! Saved artifacts: screenshots, recorded frame sequences and the
//! JSON-lines detection log.
//!
//! Everything lands under the configured output root:
//! `screenshots/`, `videos/rec_<timestamp>/` and `logs/`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;
use serde::Serialize;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::detect::FrameResult;

const TIMESTAMP_FORMAT: &[FormatItem<'_>] =
    format_description!("[year][month][day]_[hour][minute][second]");

fn timestamp() -> Result<String> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&TIMESTAMP_FORMAT)
        .context("failed to format timestamp")
}

/// Output directory tree. Subdirectories are created lazily on first use.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    root: PathBuf,
}

impl OutputPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure(&self, sub: &str) -> Result<PathBuf> {
        let dir = self.root.join(sub);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Save one annotated frame as a timestamped PNG and return its path.
    pub fn save_screenshot(&self, frame: &RgbImage) -> Result<PathBuf> {
        let dir = self.ensure("screenshots")?;
        let path = dir.join(format!("capture_{}.png", timestamp()?));
        frame
            .save(&path)
            .with_context(|| format!("failed to save screenshot {}", path.display()))?;
        log::info!("screenshot saved to {}", path.display());
        Ok(path)
    }

    /// Start a new recording session directory under `videos/`.
    pub fn start_recording(&self) -> Result<FrameRecorder> {
        let dir = self.ensure("videos")?;
        let session = dir.join(format!("rec_{}", timestamp()?));
        fs::create_dir_all(&session)
            .with_context(|| format!("failed to create recording dir {}", session.display()))?;
        log::info!("recording to {}", session.display());
        Ok(FrameRecorder {
            dir: session,
            frames_written: 0,
        })
    }

    /// Open the JSON-lines detection log for this session.
    pub fn open_detection_log(&self) -> Result<DetectionLog> {
        let dir = self.ensure("logs")?;
        let path = dir.join(format!("detections_{}.jsonl", timestamp()?));
        let file = File::create(&path)
            .with_context(|| format!("failed to create detection log {}", path.display()))?;
        Ok(DetectionLog {
            writer: BufWriter::new(file),
            path,
        })
    }
}

/// Writes recorded frames as a numbered JPEG sequence.
pub struct FrameRecorder {
    dir: PathBuf,
    frames_written: u64,
}

impl FrameRecorder {
    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.jpg", self.frames_written));
        frame
            .save(&path)
            .with_context(|| format!("failed to write recorded frame {}", path.display()))?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    frame: u64,
    bottles: usize,
    with_cap: usize,
    without_cap: usize,
    brands: Vec<&'a str>,
}

/// Append-only JSON-lines log of per-frame detection counts.
pub struct DetectionLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl DetectionLog {
    pub fn record(&mut self, frame_index: u64, result: &FrameResult) -> Result<()> {
        let counts = result.counts();
        let record = LogRecord {
            frame: frame_index,
            bottles: counts.bottles,
            with_cap: counts.with_cap,
            without_cap: counts.without_cap,
            brands: result.brands(),
        };
        serde_json::to_writer(&mut self.writer, &record)
            .with_context(|| format!("failed to write detection log {}", self.path.display()))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("failed to flush detection log")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
