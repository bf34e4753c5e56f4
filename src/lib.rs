pub mod camera;
pub mod config;
pub mod detect;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod stats;

pub use config::AppConfig;
pub use detect::{nms, BBox, CapState, Detection, FrameResult};
pub use pipeline::{DetectionOptions, DetectionPipeline};

#[cfg(feature = "gui")]
pub mod gui;
