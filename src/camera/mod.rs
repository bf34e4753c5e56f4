//! Frame sources for the capture loop.
//!
//! Two sources exist: a deterministic synthetic generator (always available,
//! used by tests and by the demo loop) and a V4L2 webcam source behind the
//! `camera-v4l2` feature. Sources release their device when dropped, so a
//! stopped capture can always be restarted.

#[cfg(feature = "camera-v4l2")]
mod v4l2;

#[cfg(feature = "camera-v4l2")]
pub use v4l2::V4l2Source;

use anyhow::Result;
use image::RgbImage;

use crate::config::CameraSettings;

/// A source of RGB frames at a nominal resolution.
pub trait FrameSource: Send {
    /// Human-readable identity, shown in the status line.
    fn describe(&self) -> String;

    /// Capture the next frame. A failed read is transient: the caller logs
    /// it and skips the frame.
    fn read_frame(&mut self) -> Result<RgbImage>;

    fn frames_captured(&self) -> u64;
}

/// Open the configured source. Negative device ids select the synthetic
/// generator; real devices require the `camera-v4l2` feature.
pub fn open_source(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    if settings.device_id < 0 {
        return Ok(Box::new(SyntheticSource::new(
            settings.width,
            settings.height,
        )));
    }

    #[cfg(feature = "camera-v4l2")]
    {
        let source = V4l2Source::open(settings)?;
        return Ok(Box::new(source));
    }

    #[cfg(not(feature = "camera-v4l2"))]
    {
        log::warn!(
            "built without camera-v4l2; using synthetic source instead of device {}",
            settings.device_id
        );
        Ok(Box::new(SyntheticSource::new(
            settings.width,
            settings.height,
        )))
    }
}

/// Deterministic test-pattern source: a gradient background with a bright
/// block drifting across the frame.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("synthetic {}x{}", self.width, self.height)
    }

    fn read_frame(&mut self) -> Result<RgbImage> {
        self.frame_count += 1;
        let tick = self.frame_count as u32;

        let mut frame = RgbImage::from_fn(self.width, self.height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y + tick) % 256) as u8])
        });

        // Drifting block, so consecutive frames differ.
        let block = self.width / 8;
        let bx = (tick * 3) % self.width.saturating_sub(block).max(1);
        let by = self.height / 3;
        for y in by..(by + block).min(self.height) {
            for x in bx..(bx + block).min(self.width) {
                frame.put_pixel(x, y, image::Rgb([250, 250, 250]));
            }
        }
        Ok(frame)
    }

    fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}
