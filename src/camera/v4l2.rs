#![cfg(feature = "camera-v4l2")]

//! V4L2 webcam source.
//!
//! Negotiates RGB24 where the driver supports it and falls back to YUYV with
//! software conversion. The memory-mapped stream borrows the device handle,
//! hence the self-referencing state struct.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ouroboros::self_referencing;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;

use super::FrameSource;
use crate::config::CameraSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PixelFormat {
    Rgb24,
    Yuyv,
}

pub struct V4l2Source {
    state: DeviceState,
    device_id: i32,
    width: u32,
    height: u32,
    format: PixelFormat,
    frame_count: u64,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub fn open(settings: &CameraSettings) -> Result<Self> {
        let device = v4l::Device::new(settings.device_id as usize)
            .with_context(|| format!("failed to open camera device {}", settings.device_id))?;

        let mut format = device.format().context("failed to read camera format")?;
        format.width = settings.width;
        format.height = settings.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");
        let mut format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("failed to set RGB24 on device {}: {err}", settings.device_id);
                device.format().context("failed to re-read camera format")?
            }
        };

        let pixel_format = match &format.fourcc.repr {
            b"RGB3" => PixelFormat::Rgb24,
            b"YUYV" => PixelFormat::Yuyv,
            _ => {
                // Last resort: ask for YUYV explicitly.
                format.fourcc = v4l::FourCC::new(b"YUYV");
                format = device
                    .set_format(&format)
                    .context("failed to negotiate a supported pixel format")?;
                if &format.fourcc.repr != b"YUYV" {
                    return Err(anyhow!(
                        "camera device {} offers unsupported pixel format {}",
                        settings.device_id,
                        format.fourcc
                    ));
                }
                PixelFormat::Yuyv
            }
        };

        if settings.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(settings.fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("failed to set fps on device {}: {err}", settings.device_id);
            }
        }

        let width = format.width;
        let height = format.height;
        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("failed to map camera buffers"))
            },
        }
        .try_build()?;

        log::info!(
            "camera {} open at {}x{} ({:?})",
            settings.device_id,
            width,
            height,
            pixel_format
        );

        Ok(Self {
            state,
            device_id: settings.device_id,
            width,
            height,
            format: pixel_format,
            frame_count: 0,
        })
    }
}

impl FrameSource for V4l2Source {
    fn describe(&self) -> String {
        format!("/dev/video{} {}x{}", self.device_id, self.width, self.height)
    }

    fn read_frame(&mut self) -> Result<RgbImage> {
        let format = self.format;
        let (width, height) = (self.width, self.height);
        let rgb = self.state.with_stream_mut(|stream| -> Result<Vec<u8>> {
            let (buf, _meta) = stream.next().context("failed to capture camera frame")?;
            normalize_to_rgb(buf, width, height, format)
        })?;
        self.frame_count += 1;
        RgbImage::from_raw(self.width, self.height, rgb)
            .ok_or_else(|| anyhow!("camera frame buffer has wrong length"))
    }

    fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}

fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
    match format {
        PixelFormat::Rgb24 => {
            let expected = pixel_count * 3;
            if pixels.len() < expected {
                return Err(anyhow!(
                    "RGB frame too short: expected {expected}, got {}",
                    pixels.len()
                ));
            }
            Ok(pixels[..expected].to_vec())
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, pixel_count),
    }
}

/// YUYV 4:2:2 to packed RGB24.
fn yuyv_to_rgb(pixels: &[u8], pixel_count: usize) -> Result<Vec<u8>> {
    let expected = pixel_count * 2;
    if pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame too short: expected {expected}, got {}",
            pixels.len()
        ));
    }

    let mut rgb = vec![0u8; pixel_count * 3];
    for (i, chunk) in pixels[..expected].chunks_exact(4).enumerate() {
        let [y0, u, y1, v] = [chunk[0] as f32, chunk[1] as f32, chunk[2] as f32, chunk[3] as f32];
        let u = u - 128.0;
        let v = v - 128.0;
        for (j, y) in [y0, y1].into_iter().enumerate() {
            let r = y + 1.402 * v;
            let g = y - 0.344_136 * u - 0.714_136 * v;
            let b = y + 1.772 * u;
            let offset = (i * 2 + j) * 3;
            rgb[offset] = clamp_to_u8(r);
            rgb[offset + 1] = clamp_to_u8(g);
            rgb[offset + 2] = clamp_to_u8(b);
        }
    }
    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
