//! Unified detection pipeline: bottle detector + cap-state detector +
//! brand classifier, combined into a single per-frame entry point.

use anyhow::Result;
use image::RgbImage;

use crate::config::{AppConfig, CAP_NUM_CLASSES, COCO_BOTTLE_CLASS_ID, COCO_NUM_CLASSES};
use crate::detect::backend::{Classifier, Detector};
use crate::detect::{BottleDetection, BrandLabel, CapDetection, CapState, FrameResult};
use crate::imaging;

/// Fractional padding added around a bottle box before classification.
const ROI_PADDING: f32 = 0.05;

/// Per-call processing options: capability flags plus current thresholds.
///
/// Passing these per frame keeps the pipeline free of mutable state; slider
/// changes in the UI simply show up in the next call.
#[derive(Debug, Clone, Copy)]
pub struct DetectionOptions {
    pub enable_bottle: bool,
    pub enable_cap: bool,
    pub enable_brand: bool,
    pub enhance_contrast: bool,
    pub bottle_conf: f32,
    pub cap_conf: f32,
    pub brand_conf: f32,
    pub iou_threshold: f32,
}

impl DetectionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            enable_bottle: config.processing.enable_bottle_detection,
            enable_cap: config.processing.enable_cap_detection,
            enable_brand: config.processing.enable_brand_classification,
            enhance_contrast: config.processing.enhance_contrast,
            bottle_conf: config.detection.bottle_conf,
            cap_conf: config.detection.cap_conf,
            brand_conf: config.detection.brand_conf,
            iou_threshold: config.detection.iou_threshold,
        }
    }
}

/// Holds the loaded models. No mutable state across calls; the only side
/// effect of `process_frame` is its return value.
pub struct DetectionPipeline {
    bottle_detector: Box<dyn Detector>,
    cap_detector: Option<Box<dyn Detector>>,
    brand_classifier: Option<Box<dyn Classifier>>,
    brand_classes: Vec<String>,
    classifier_input: u32,
}

impl DetectionPipeline {
    /// Load all models from the configured paths.
    ///
    /// A missing bottle detector is fatal. The cap detector and brand
    /// classifier degrade gracefully: the pipeline stays usable and the
    /// corresponding outputs are simply absent.
    #[cfg(feature = "backend-tract")]
    pub fn load(config: &AppConfig) -> Result<Self> {
        use crate::detect::tract::{OnnxClassifier, YoloDetector};

        let models = &config.models;
        if !models.bottle_detector.exists() {
            anyhow::bail!(
                "bottle detector model not found at {}",
                models.bottle_detector.display()
            );
        }
        let bottle_detector = YoloDetector::load(
            &models.bottle_detector,
            models.detector_input,
            COCO_NUM_CLASSES,
        )?
        .with_class_filter(COCO_BOTTLE_CLASS_ID);
        log::info!(
            "bottle detector loaded from {}",
            models.bottle_detector.display()
        );

        let cap_detector = if models.cap_detector.exists() {
            let detector =
                YoloDetector::load(&models.cap_detector, models.detector_input, CAP_NUM_CLASSES)?;
            log::info!("cap detector loaded from {}", models.cap_detector.display());
            Some(Box::new(detector) as Box<dyn Detector>)
        } else {
            log::warn!(
                "cap detector not found at {}, cap detection disabled",
                models.cap_detector.display()
            );
            None
        };

        let brand_classes = crate::config::load_brand_classes(&models.brand_classes)?;
        let brand_classifier = if models.brand_classifier.exists() {
            let classifier = OnnxClassifier::load(
                &models.brand_classifier,
                models.classifier_input,
                brand_classes.len(),
            )?;
            log::info!(
                "brand classifier loaded from {} ({} classes)",
                models.brand_classifier.display(),
                brand_classes.len()
            );
            Some(Box::new(classifier) as Box<dyn Classifier>)
        } else {
            log::warn!(
                "brand classifier not found at {}, brand classification disabled",
                models.brand_classifier.display()
            );
            None
        };

        Ok(Self {
            bottle_detector: Box::new(bottle_detector),
            cap_detector,
            brand_classifier,
            brand_classes,
            classifier_input: models.classifier_input,
        })
    }

    /// Without the tract backend no model files can be loaded; the pipeline
    /// runs with an inert stub detector so the rest of the app stays usable.
    #[cfg(not(feature = "backend-tract"))]
    pub fn load(config: &AppConfig) -> Result<Self> {
        use crate::detect::stub::StubDetector;

        log::warn!("built without backend-tract; detection will report nothing");
        let brand_classes = crate::config::load_brand_classes(&config.models.brand_classes)?;
        Ok(Self {
            bottle_detector: Box::new(StubDetector::empty()),
            cap_detector: None,
            brand_classifier: None,
            brand_classes,
            classifier_input: config.models.classifier_input,
        })
    }

    /// Assemble a pipeline from explicit backends.
    pub fn with_backends(
        bottle_detector: Box<dyn Detector>,
        cap_detector: Option<Box<dyn Detector>>,
        brand_classifier: Option<Box<dyn Classifier>>,
        brand_classes: Vec<String>,
        classifier_input: u32,
    ) -> Self {
        Self {
            bottle_detector,
            cap_detector,
            brand_classifier,
            brand_classes,
            classifier_input,
        }
    }

    pub fn brand_classes(&self) -> &[String] {
        &self.brand_classes
    }

    pub fn has_cap_detector(&self) -> bool {
        self.cap_detector.is_some()
    }

    pub fn has_brand_classifier(&self) -> bool {
        self.brand_classifier.is_some()
    }

    /// Run all enabled detectors on one frame.
    ///
    /// Per-detector failures are logged and yield an empty list for that
    /// category; a single bad frame never poisons the pipeline.
    pub fn process_frame(&self, frame: &RgbImage, opts: &DetectionOptions) -> FrameResult {
        let processed;
        let detect_input: &RgbImage = if opts.enhance_contrast {
            processed = imaging::enhance_contrast(frame);
            &processed
        } else {
            frame
        };

        let mut result = FrameResult {
            width: frame.width(),
            height: frame.height(),
            ..FrameResult::default()
        };

        if opts.enable_bottle {
            match self
                .bottle_detector
                .detect(detect_input, opts.bottle_conf, opts.iou_threshold)
            {
                Ok(detections) => {
                    result.bottles = detections
                        .into_iter()
                        .map(|detection| {
                            let brand = if opts.enable_brand {
                                self.classify_brand(frame, &detection.bbox, opts.brand_conf)
                            } else {
                                None
                            };
                            BottleDetection { detection, brand }
                        })
                        .collect();
                }
                Err(err) => log::warn!(
                    "bottle detection failed on this frame ({}): {err:#}",
                    self.bottle_detector.name()
                ),
            }
        }

        if opts.enable_cap {
            if let Some(cap_detector) = &self.cap_detector {
                match cap_detector.detect(detect_input, opts.cap_conf, opts.iou_threshold) {
                    Ok(detections) => {
                        result.caps = detections
                            .into_iter()
                            .map(|detection| CapDetection {
                                state: CapState::from_class_id(detection.class_id),
                                detection,
                            })
                            .collect();
                    }
                    Err(err) => log::warn!(
                        "cap detection failed on this frame ({}): {err:#}",
                        cap_detector.name()
                    ),
                }
            }
        }

        result
    }

    /// Classify the brand inside a bottle box. `None` below threshold, on a
    /// degenerate crop, or when no classifier is loaded.
    fn classify_brand(
        &self,
        frame: &RgbImage,
        bbox: &crate::detect::BBox,
        brand_conf: f32,
    ) -> Option<BrandLabel> {
        let classifier = self.brand_classifier.as_ref()?;
        let roi = imaging::extract_roi(frame, bbox, ROI_PADDING)?;
        let crop = imaging::resize_for_classifier(&roi, self.classifier_input);

        let scores = match classifier.classify(&crop) {
            Ok(scores) => scores,
            Err(err) => {
                log::warn!(
                    "brand classification failed ({}): {err:#}",
                    classifier.name()
                );
                return None;
            }
        };

        let (best_idx, best_score) = scores
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
        if best_score < brand_conf {
            return None;
        }
        let name = self.brand_classes.get(best_idx)?.clone();
        Some(BrandLabel {
            name,
            confidence: best_score,
        })
    }
}
