//! Stateless frame utilities: contrast enhancement, ROI extraction,
//! classifier resizing and annotation drawing.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::config::Palette;
use crate::detect::{BBox, CapState, FrameResult};

const CLAHE_TILES: u32 = 8;
const CLAHE_CLIP_LIMIT: f32 = 2.0;

fn luma(px: &Rgb<u8>) -> f32 {
    0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
}

/// Contrast-limited adaptive histogram equalization on the luma channel.
///
/// The frame is divided into an 8x8 tile grid; each tile gets a clipped,
/// redistributed histogram and its own equalization LUT. Per-pixel output is
/// bilinearly interpolated between the four surrounding tile LUTs, and the
/// resulting luma gain is applied back to all three channels.
pub fn enhance_contrast(frame: &RgbImage) -> RgbImage {
    let (w, h) = frame.dimensions();
    if w < CLAHE_TILES || h < CLAHE_TILES {
        return frame.clone();
    }

    let tile_w = w.div_ceil(CLAHE_TILES);
    let tile_h = h.div_ceil(CLAHE_TILES);

    // Per-tile equalization LUTs.
    let mut luts = vec![[0u8; 256]; (CLAHE_TILES * CLAHE_TILES) as usize];
    for ty in 0..CLAHE_TILES {
        for tx in 0..CLAHE_TILES {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u32; 256];
            let mut count = 0u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[luma(frame.get_pixel(x, y)) as usize] += 1;
                    count += 1;
                }
            }
            if count == 0 {
                continue;
            }

            // Clip bins and redistribute the excess uniformly.
            let clip = ((CLAHE_CLIP_LIMIT * count as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let bonus = excess / 256;
            for bin in hist.iter_mut() {
                *bin += bonus;
            }

            let lut = &mut luts[(ty * CLAHE_TILES + tx) as usize];
            let mut cdf = 0u32;
            for (value, bin) in hist.iter().enumerate() {
                cdf += bin;
                lut[value] = ((cdf as f32 / count as f32) * 255.0).round().min(255.0) as u8;
            }
        }
    }

    let tile_at = |tx: i64, ty: i64| -> &[u8; 256] {
        let tx = tx.clamp(0, CLAHE_TILES as i64 - 1) as u32;
        let ty = ty.clamp(0, CLAHE_TILES as i64 - 1) as u32;
        &luts[(ty * CLAHE_TILES + tx) as usize]
    };

    let mut out = frame.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let value = luma(px);
        let bin = value as usize;

        // Position relative to tile centers, for bilinear LUT interpolation.
        let fx = (x as f32 - tile_w as f32 / 2.0) / tile_w as f32;
        let fy = (y as f32 - tile_h as f32 / 2.0) / tile_h as f32;
        let tx = fx.floor() as i64;
        let ty = fy.floor() as i64;
        let wx = fx - tx as f32;
        let wy = fy - ty as f32;

        let v00 = tile_at(tx, ty)[bin] as f32;
        let v10 = tile_at(tx + 1, ty)[bin] as f32;
        let v01 = tile_at(tx, ty + 1)[bin] as f32;
        let v11 = tile_at(tx + 1, ty + 1)[bin] as f32;
        let equalized = v00 * (1.0 - wx) * (1.0 - wy)
            + v10 * wx * (1.0 - wy)
            + v01 * (1.0 - wx) * wy
            + v11 * wx * wy;

        let gain = if value > 0.0 { equalized / value } else { 1.0 };
        for channel in px.0.iter_mut() {
            *channel = (*channel as f32 * gain).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Extract a region of interest with fractional padding, clamped to the
/// frame. Returns `None` when the padded box degenerates to zero area.
pub fn extract_roi(frame: &RgbImage, bbox: &BBox, padding: f32) -> Option<RgbImage> {
    let (w, h) = frame.dimensions();
    let pad_w = bbox.width() * padding;
    let pad_h = bbox.height() * padding;

    let x1 = (bbox.x1 - pad_w).max(0.0) as u32;
    let y1 = (bbox.y1 - pad_h).max(0.0) as u32;
    let x2 = ((bbox.x2 + pad_w).min(w as f32)) as u32;
    let y2 = ((bbox.y2 + pad_h).min(h as f32)) as u32;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(image::imageops::crop_imm(frame, x1, y1, x2 - x1, y2 - y1).to_image())
}

/// Resize a crop to the classifier's expected square input.
pub fn resize_for_classifier(roi: &RgbImage, size: u32) -> RgbImage {
    image::imageops::resize(roi, size, size, image::imageops::FilterType::Triangle)
}

/// Draw a hollow rectangle with the given line thickness.
pub fn draw_box(frame: &mut RgbImage, bbox: &BBox, color: Rgb<u8>, thickness: u32) {
    let clamped = bbox.clamped(frame.width(), frame.height());
    let w = clamped.width() as i32;
    let h = clamped.height() as i32;
    if w < 2 || h < 2 {
        return;
    }
    for inset in 0..thickness as i32 {
        let rw = w - 2 * inset;
        let rh = h - 2 * inset;
        if rw < 1 || rh < 1 {
            break;
        }
        let rect = Rect::at(clamped.x1 as i32 + inset, clamped.y1 as i32 + inset)
            .of_size(rw as u32, rh as u32);
        draw_hollow_rect_mut(frame, rect, color);
    }
}

/// Draw all detections of a frame result using the configured palette.
/// Broken caps are not rendered.
pub fn annotate_frame(frame: &mut RgbImage, result: &FrameResult, palette: &Palette) {
    for bottle in &result.bottles {
        draw_box(frame, &bottle.detection.bbox, Rgb(palette.bottle), 2);
    }
    for cap in &result.caps {
        let color = match cap.state {
            CapState::WithCap => Rgb(palette.with_cap),
            CapState::WithoutCap => Rgb(palette.without_cap),
            CapState::BrokenCap => continue,
            CapState::Unknown => Rgb(palette.unknown),
        };
        draw_box(frame, &cap.detection.bbox, color, 2);
    }
}
