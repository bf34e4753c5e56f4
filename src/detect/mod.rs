pub mod backend;
pub mod stub;
#[cfg(feature = "backend-tract")]
pub mod tract;

/// Axis-aligned bounding box in pixel coordinates of the source frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Clamp the box to a frame of the given dimensions.
    pub fn clamped(&self, frame_w: u32, frame_h: u32) -> Self {
        Self {
            x1: self.x1.max(0.0),
            y1: self.y1.max(0.0),
            x2: self.x2.min(frame_w as f32),
            y2: self.y2.min(frame_h as f32),
        }
    }

    /// Intersection over union with another box.
    ///
    /// Returns 0.0 for disjoint boxes and for degenerate (zero-area) pairs.
    pub fn iou(&self, other: &BBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// One recognized object instance. Lives for a single processed frame.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: usize,
}

/// Cap state reported by the cap detector.
///
/// The cap model has five raw classes; ids 1/4 both mean a cap is present
/// and ids 2/3 both mean it is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapState {
    WithCap,
    WithoutCap,
    BrokenCap,
    Unknown,
}

impl CapState {
    pub fn from_class_id(class_id: usize) -> Self {
        match class_id {
            0 => CapState::BrokenCap,
            1 | 4 => CapState::WithCap,
            2 | 3 => CapState::WithoutCap,
            _ => CapState::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CapState::WithCap => "with cap",
            CapState::WithoutCap => "without cap",
            CapState::BrokenCap => "broken cap",
            CapState::Unknown => "unknown",
        }
    }
}

/// Brand label attached to a bottle detection by the classifier.
#[derive(Debug, Clone)]
pub struct BrandLabel {
    pub name: String,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct BottleDetection {
    pub detection: Detection,
    pub brand: Option<BrandLabel>,
}

#[derive(Debug, Clone)]
pub struct CapDetection {
    pub detection: Detection,
    pub state: CapState,
}

/// Per-frame counts derived from a `FrameResult`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCounts {
    pub bottles: usize,
    pub with_cap: usize,
    pub without_cap: usize,
    pub total_caps: usize,
}

/// Aggregate of all detections for one captured frame.
#[derive(Debug, Clone, Default)]
pub struct FrameResult {
    pub bottles: Vec<BottleDetection>,
    pub caps: Vec<CapDetection>,
    pub width: u32,
    pub height: u32,
}

impl FrameResult {
    pub fn counts(&self) -> FrameCounts {
        let mut counts = FrameCounts {
            bottles: self.bottles.len(),
            total_caps: self.caps.len(),
            ..FrameCounts::default()
        };
        for cap in &self.caps {
            match cap.state {
                CapState::WithCap => counts.with_cap += 1,
                CapState::WithoutCap => counts.without_cap += 1,
                _ => {}
            }
        }
        counts
    }

    /// Brand names attached to bottle detections this frame.
    pub fn brands(&self) -> Vec<&str> {
        self.bottles
            .iter()
            .filter_map(|b| b.brand.as_ref().map(|l| l.name.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bottles.is_empty() && self.caps.is_empty()
    }
}

/// Greedy non-maximum suppression: sort by confidence descending, drop any
/// box overlapping an already-kept box above `iou_threshold`.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_unstable_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if kept
            .iter()
            .all(|k| k.bbox.iou(&candidate.bbox) <= iou_threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}
