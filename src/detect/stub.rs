//! Canned backends for tests and for builds without `backend-tract`.

use anyhow::Result;
use image::RgbImage;

use super::backend::{Classifier, Detector};
use super::{nms, Detection};

/// Detector that replays a fixed set of detections.
///
/// The canned boxes still go through the same confidence filter and NMS as a
/// real backend, so pipeline-level threshold and suppression behavior can be
/// exercised without model files.
#[derive(Debug, Clone, Default)]
pub struct StubDetector {
    detections: Vec<Detection>,
}

impl StubDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// A detector that never finds anything.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Detector for StubDetector {
    fn name(&self) -> &str {
        "stub"
    }

    fn detect(
        &self,
        _frame: &RgbImage,
        conf_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let candidates = self
            .detections
            .iter()
            .filter(|d| d.confidence >= conf_threshold)
            .cloned()
            .collect();
        Ok(nms(candidates, iou_threshold))
    }
}

/// Classifier that replays a fixed score vector.
#[derive(Debug, Clone)]
pub struct StubClassifier {
    scores: Vec<f32>,
}

impl StubClassifier {
    pub fn new(scores: Vec<f32>) -> Self {
        Self { scores }
    }

    /// Uniform low scores over `n` classes; never clears a sane threshold.
    pub fn uncertain(n: usize) -> Self {
        Self {
            scores: vec![1.0 / n as f32; n],
        }
    }
}

impl Classifier for StubClassifier {
    fn name(&self) -> &str {
        "stub"
    }

    fn classify(&self, _crop: &RgbImage) -> Result<Vec<f32>> {
        Ok(self.scores.clone())
    }
}
