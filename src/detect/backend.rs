use anyhow::Result;
use image::RgbImage;

use super::Detection;

/// Object detector backend.
///
/// Implementations run one forward pass per call and return boxes in the
/// pixel coordinates of the input frame. Filtering by `conf_threshold` and
/// suppression at `iou_threshold` happen inside the backend so that callers
/// never see sub-threshold or duplicate boxes.
pub trait Detector: Send + Sync {
    /// Backend identifier, used in logs.
    fn name(&self) -> &str;

    fn detect(
        &self,
        frame: &RgbImage,
        conf_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<Detection>>;
}

/// Image classifier backend.
///
/// Returns one score per class, in the order of the configured class list.
/// The crop handed in is already resized to the classifier's input shape.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, crop: &RgbImage) -> Result<Vec<f32>>;
}
