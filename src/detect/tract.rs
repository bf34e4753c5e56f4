#![cfg(feature = "backend-tract")]

//! ONNX backends built on tract.
//!
//! `YoloDetector` wraps a YOLOv8-style detector (output `[1, 4+C, N]`);
//! `OnnxClassifier` wraps a softmax image classifier. Both load a local model
//! file and run CPU inference; no network I/O, no disk writes after load.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tract_onnx::prelude::*;

use super::backend::{Classifier, Detector};
use super::{nms, BBox, Detection};

fn load_model(path: &Path, input_size: u32) -> Result<TypedRunnableModel<TypedModel>> {
    tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to load ONNX model from {}", path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(
                f32::datum_type(),
                tvec!(1, 3, input_size as usize, input_size as usize),
            ),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}

/// Resize to `size`x`size` and convert to an NCHW f32 tensor in [0, 1].
fn image_to_tensor(frame: &RgbImage, size: u32) -> Tensor {
    let resized = if frame.dimensions() == (size, size) {
        frame.clone()
    } else {
        image::imageops::resize(frame, size, size, image::imageops::FilterType::Triangle)
    };
    let raw = resized.as_raw();
    let side = size as usize;
    let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
        raw[(y * side + x) * 3 + c] as f32 / 255.0
    });
    input.into_tensor()
}

/// YOLOv8-style object detector.
pub struct YoloDetector {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    num_classes: usize,
    /// When set, only proposals whose best class matches are kept.
    keep_class: Option<usize>,
    label: String,
}

impl YoloDetector {
    pub fn load(path: &Path, input_size: u32, num_classes: usize) -> Result<Self> {
        let model = load_model(path, input_size)?;
        Ok(Self {
            model,
            input_size,
            num_classes,
            keep_class: None,
            label: format!("yolo:{}", path.display()),
        })
    }

    /// Restrict detections to a single class id (e.g. COCO bottle = 39).
    pub fn with_class_filter(mut self, class_id: usize) -> Self {
        self.keep_class = Some(class_id);
        self
    }

    fn decode(
        &self,
        output: &Tensor,
        frame_w: u32,
        frame_h: u32,
        conf_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let view = output
            .to_array_view::<f32>()
            .context("detector output tensor was not f32")?;
        let shape = view.shape();
        if shape.len() != 3 || shape[1] < 4 + self.num_classes {
            return Err(anyhow!(
                "unexpected detector output shape {:?}, wanted [1, {}, N]",
                shape,
                4 + self.num_classes
            ));
        }
        let num_proposals = shape[2];

        let scale_x = frame_w as f32 / self.input_size as f32;
        let scale_y = frame_h as f32 / self.input_size as f32;

        let mut candidates = Vec::new();
        for i in 0..num_proposals {
            // Rows are [cx, cy, w, h, cls0, cls1, ...].
            let mut best_class = 0usize;
            let mut best_score = 0f32;
            for c in 0..self.num_classes {
                let s = view[[0, 4 + c, i]];
                if s > best_score {
                    best_score = s;
                    best_class = c;
                }
            }
            if best_score < conf_threshold {
                continue;
            }
            if let Some(keep) = self.keep_class {
                if best_class != keep {
                    continue;
                }
            }

            let cx = view[[0, 0, i]];
            let cy = view[[0, 1, i]];
            let w = view[[0, 2, i]];
            let h = view[[0, 3, i]];

            let bbox = BBox::new(
                (cx - w / 2.0) * scale_x,
                (cy - h / 2.0) * scale_y,
                (cx + w / 2.0) * scale_x,
                (cy + h / 2.0) * scale_y,
            )
            .clamped(frame_w, frame_h);

            candidates.push(Detection {
                bbox,
                confidence: best_score,
                class_id: best_class,
            });
        }
        Ok(candidates)
    }
}

impl Detector for YoloDetector {
    fn name(&self) -> &str {
        &self.label
    }

    fn detect(
        &self,
        frame: &RgbImage,
        conf_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let input = image_to_tensor(frame, self.input_size);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("detector inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("detector produced no outputs"))?;
        let candidates = self.decode(output, frame.width(), frame.height(), conf_threshold)?;
        Ok(nms(candidates, iou_threshold))
    }
}

/// Fixed-input image classifier; the model is expected to end in softmax.
pub struct OnnxClassifier {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    num_classes: usize,
    label: String,
}

impl OnnxClassifier {
    pub fn load(path: &Path, input_size: u32, num_classes: usize) -> Result<Self> {
        let model = load_model(path, input_size)?;
        Ok(Self {
            model,
            input_size,
            num_classes,
            label: format!("onnx:{}", path.display()),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.label
    }

    fn classify(&self, crop: &RgbImage) -> Result<Vec<f32>> {
        let input = image_to_tensor(crop, self.input_size);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("classifier inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("classifier produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("classifier output tensor was not f32")?;
        let scores: Vec<f32> = view.iter().copied().take(self.num_classes).collect();
        if scores.len() != self.num_classes {
            return Err(anyhow!(
                "classifier returned {} scores, configured for {}",
                scores.len(),
                self.num_classes
            ));
        }
        Ok(scores)
    }
}
