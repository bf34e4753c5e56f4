//! Process-wide configuration: model paths, thresholds, camera parameters,
//! color palette and output directories.
//!
//! Settings are read-mostly: defaults, then an optional TOML file, then CLI
//! overrides. Thresholds may later be adjusted live from the UI; everything
//! else is fixed for the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// COCO class id for "bottle" in the stock detector.
pub const COCO_BOTTLE_CLASS_ID: usize = 39;
/// Number of COCO classes scored by the stock detector.
pub const COCO_NUM_CLASSES: usize = 80;
/// Number of raw classes in the cap-state detector.
pub const CAP_NUM_CLASSES: usize = 5;

/// Fallback brand list, used when the classes file is absent.
pub const DEFAULT_BRANDS: &[&str] = &[
    "Ain_Atlas",
    "Ain_Ifrane",
    "Ain_Saiss",
    "Aquafina",
    "Bahia",
    "Ifrane",
    "Mondariz",
    "Oulmes",
    "Sidi_Ali",
    "Sidi_Hrazem",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub models: ModelSettings,
    pub detection: DetectionSettings,
    pub camera: CameraSettings,
    pub processing: ProcessingSettings,
    pub palette: Palette,
    /// Root of the output tree (screenshots/, videos/, logs/).
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub bottle_detector: PathBuf,
    pub cap_detector: PathBuf,
    pub brand_classifier: PathBuf,
    /// JSON array of brand class names, in classifier output order.
    pub brand_classes: PathBuf,
    /// Square input size of both detectors.
    pub detector_input: u32,
    /// Square input size of the brand classifier.
    pub classifier_input: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct DetectionSettings {
    pub bottle_conf: f32,
    pub cap_conf: f32,
    pub brand_conf: f32,
    pub iou_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// V4L2 device index; negative selects the synthetic test source.
    pub device_id: i32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ProcessingSettings {
    pub enhance_contrast: bool,
    pub enable_gpu: bool,
    pub enable_bottle_detection: bool,
    pub enable_cap_detection: bool,
    pub enable_brand_classification: bool,
}

/// RGB colors for annotation boxes.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bottle: [u8; 3],
    pub with_cap: [u8; 3],
    pub without_cap: [u8; 3],
    pub unknown: [u8; 3],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            bottle: [0, 0, 255],
            with_cap: [0, 255, 0],
            without_cap: [255, 0, 0],
            unknown: [128, 128, 128],
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelSettings {
                bottle_detector: PathBuf::from("models/yolov8n.onnx"),
                cap_detector: PathBuf::from("models/cap_detector.onnx"),
                brand_classifier: PathBuf::from("models/brand_classifier.onnx"),
                brand_classes: PathBuf::from("models/brand_classes.json"),
                detector_input: 640,
                classifier_input: 224,
            },
            detection: DetectionSettings {
                bottle_conf: 0.5,
                cap_conf: 0.6,
                brand_conf: 0.4,
                iou_threshold: 0.45,
            },
            camera: CameraSettings {
                device_id: 0,
                width: 640,
                height: 480,
                fps: 30,
            },
            processing: ProcessingSettings {
                enhance_contrast: true,
                enable_gpu: true,
                enable_bottle_detection: true,
                enable_cap_detection: true,
                enable_brand_classification: true,
            },
            palette: Palette::default(),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

// Optional-field mirror of the TOML file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    models: Option<ModelsFile>,
    detection: Option<DetectionFile>,
    camera: Option<CameraFile>,
    processing: Option<ProcessingFile>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelsFile {
    bottle_detector: Option<PathBuf>,
    cap_detector: Option<PathBuf>,
    brand_classifier: Option<PathBuf>,
    brand_classes: Option<PathBuf>,
    detector_input: Option<u32>,
    classifier_input: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DetectionFile {
    bottle_conf: Option<f32>,
    cap_conf: Option<f32>,
    brand_conf: Option<f32>,
    iou_threshold: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct CameraFile {
    device_id: Option<i32>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ProcessingFile {
    enhance_contrast: Option<bool>,
    enable_gpu: Option<bool>,
    enable_bottle_detection: Option<bool>,
    enable_cap_detection: Option<bool>,
    enable_brand_classification: Option<bool>,
}

/// Clamp a confidence or overlap threshold into its valid range.
pub fn clamp_threshold(value: f32) -> f32 {
    if value.is_nan() {
        return 0.5;
    }
    value.clamp(0.0, 1.0)
}

impl AppConfig {
    /// Build the configuration: defaults, then the optional file, then
    /// validation. CLI overrides are applied by the caller afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(path) = path {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let file: ConfigFile = toml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?;
            cfg.apply_file(file);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(models) = file.models {
            let m = &mut self.models;
            if let Some(v) = models.bottle_detector {
                m.bottle_detector = v;
            }
            if let Some(v) = models.cap_detector {
                m.cap_detector = v;
            }
            if let Some(v) = models.brand_classifier {
                m.brand_classifier = v;
            }
            if let Some(v) = models.brand_classes {
                m.brand_classes = v;
            }
            if let Some(v) = models.detector_input {
                m.detector_input = v;
            }
            if let Some(v) = models.classifier_input {
                m.classifier_input = v;
            }
        }
        if let Some(detection) = file.detection {
            let d = &mut self.detection;
            if let Some(v) = detection.bottle_conf {
                d.bottle_conf = v;
            }
            if let Some(v) = detection.cap_conf {
                d.cap_conf = v;
            }
            if let Some(v) = detection.brand_conf {
                d.brand_conf = v;
            }
            if let Some(v) = detection.iou_threshold {
                d.iou_threshold = v;
            }
        }
        if let Some(camera) = file.camera {
            let c = &mut self.camera;
            if let Some(v) = camera.device_id {
                c.device_id = v;
            }
            if let Some(v) = camera.width {
                c.width = v;
            }
            if let Some(v) = camera.height {
                c.height = v;
            }
            if let Some(v) = camera.fps {
                c.fps = v;
            }
        }
        if let Some(processing) = file.processing {
            let p = &mut self.processing;
            if let Some(v) = processing.enhance_contrast {
                p.enhance_contrast = v;
            }
            if let Some(v) = processing.enable_gpu {
                p.enable_gpu = v;
            }
            if let Some(v) = processing.enable_bottle_detection {
                p.enable_bottle_detection = v;
            }
            if let Some(v) = processing.enable_cap_detection {
                p.enable_cap_detection = v;
            }
            if let Some(v) = processing.enable_brand_classification {
                p.enable_brand_classification = v;
            }
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = dir;
        }
    }

    fn validate(&mut self) -> Result<()> {
        let d = &mut self.detection;
        d.bottle_conf = clamp_threshold(d.bottle_conf);
        d.cap_conf = clamp_threshold(d.cap_conf);
        d.brand_conf = clamp_threshold(d.brand_conf);
        d.iou_threshold = clamp_threshold(d.iou_threshold);

        if self.camera.width == 0 || self.camera.height == 0 {
            anyhow::bail!("camera resolution must be non-zero");
        }
        if self.camera.fps == 0 {
            anyhow::bail!("camera fps must be non-zero");
        }
        if self.models.detector_input == 0 || self.models.classifier_input == 0 {
            anyhow::bail!("model input sizes must be non-zero");
        }
        Ok(())
    }

    /// (name, path, found) for every configured model file.
    pub fn model_status(&self) -> Vec<(&'static str, &Path, bool)> {
        let m = &self.models;
        vec![
            ("bottle detector", m.bottle_detector.as_path(), m.bottle_detector.exists()),
            ("cap detector", m.cap_detector.as_path(), m.cap_detector.exists()),
            ("brand classifier", m.brand_classifier.as_path(), m.brand_classifier.exists()),
            ("brand classes", m.brand_classes.as_path(), m.brand_classes.exists()),
        ]
    }
}

/// Load the brand class list from a JSON array, falling back to the
/// built-in list when the file is absent.
pub fn load_brand_classes(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        log::warn!(
            "brand classes file {} not found, using built-in list",
            path.display()
        );
        return Ok(DEFAULT_BRANDS.iter().map(|s| s.to_string()).collect());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read brand classes {}", path.display()))?;
    let classes: Vec<String> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid brand classes file {}", path.display()))?;
    if classes.is_empty() {
        anyhow::bail!("brand classes file {} is empty", path.display());
    }
    Ok(classes)
}
