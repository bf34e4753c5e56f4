use bottlesight::config::AppConfig;
use bottlesight::detect::stub::{StubClassifier, StubDetector};
use bottlesight::detect::{BBox, Detection};
use bottlesight::pipeline::{DetectionOptions, DetectionPipeline};
use image::{Rgb, RgbImage};

/// A gradient test frame, so crops from different regions differ.
pub fn test_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

pub fn det(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: usize) -> Detection {
    Detection {
        bbox: BBox::new(x1, y1, x2, y2),
        confidence,
        class_id,
    }
}

/// Default options with every stage enabled and stock thresholds.
pub fn default_options() -> DetectionOptions {
    DetectionOptions::from_config(&AppConfig::default())
}

/// Brand list used by stub pipelines.
pub const TEST_BRANDS: &[&str] = &["Alpha", "Beta", "Gamma"];

fn test_brand_classes() -> Vec<String> {
    TEST_BRANDS.iter().map(|s| s.to_string()).collect()
}

/// Pipeline with a canned bottle detector and no cap detector or classifier.
pub fn bottle_only_pipeline(bottles: Vec<Detection>) -> DetectionPipeline {
    DetectionPipeline::with_backends(
        Box::new(StubDetector::new(bottles)),
        None,
        None,
        test_brand_classes(),
        224,
    )
}

/// Pipeline with canned bottle and cap detectors plus a classifier that
/// always answers with the given per-class scores.
pub fn full_pipeline(
    bottles: Vec<Detection>,
    caps: Vec<Detection>,
    brand_scores: Vec<f32>,
) -> DetectionPipeline {
    DetectionPipeline::with_backends(
        Box::new(StubDetector::new(bottles)),
        Some(Box::new(StubDetector::new(caps))),
        Some(Box::new(StubClassifier::new(brand_scores))),
        test_brand_classes(),
        224,
    )
}
