//! Aspect-preserving resize followed by a center crop.
//!
//! The plan is computed from the depth raster. Color may come at a different
//! resolution (raw captures pair 1296x968 color with 640x480 depth) and is
//! resampled from its own size straight to the planned size.
//!
//! The downstream calibration and pose tooling assumes this exact geometry, so
//! the scale factor, the truncating size conversion and the crop offsets must
//! not change. Color is resampled bilinearly (half-pixel centers, edge clamped)
//! and truncated back to 8 bits. Depth is resampled with nearest neighbor so no
//! value that is absent from the source can appear in the output.

use crate::ingest::DepthImage;
use image::{RgbImage, imageops};
use rayon::prelude::*;
use recon_data::ResizeSpec;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResizeError {
    #[error("Source image is empty ({width}x{height})")]
    EmptySource { width: u32, height: u32 },

    #[error("Target size must be non-zero ({width}x{height})")]
    EmptyTarget { width: u32, height: u32 },
}

/// Intermediate size and crop window for one source resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub resized_width: u32,
    pub resized_height: u32,
    pub crop_x: u32,
    pub crop_y: u32,
    pub target: ResizeSpec,
}

impl ResizePlan {
    pub fn new(width: u32, height: u32, target: ResizeSpec) -> Result<Self, ResizeError> {
        if width == 0 || height == 0 {
            return Err(ResizeError::EmptySource { width, height });
        }
        if !target.is_valid() {
            return Err(ResizeError::EmptyTarget {
                width: target.width,
                height: target.height,
            });
        }

        let h_ratio = target.height as f64 / height as f64;
        let w_ratio = target.width as f64 / width as f64;
        let ratio = h_ratio.max(w_ratio);

        // Truncate, then never let truncation leave less than the crop window.
        let resized_height = ((height as f64 * ratio) as u32).max(target.height);
        let resized_width = ((width as f64 * ratio) as u32).max(target.width);

        Ok(Self {
            resized_width,
            resized_height,
            crop_x: (resized_width - target.width) / 2,
            crop_y: (resized_height - target.height) / 2,
            target,
        })
    }

    /// True when the source already has the target size.
    pub fn is_identity(&self) -> bool {
        self.resized_width == self.target.width
            && self.resized_height == self.target.height
            && self.crop_x == 0
            && self.crop_y == 0
    }
}

/// Resize and center-crop a color/depth pair to exactly `target`.
///
/// The geometry follows the depth raster; color is resized to the same
/// intermediate size whatever its own resolution.
pub fn resize_and_crop(
    color: &RgbImage,
    depth: &DepthImage,
    target: ResizeSpec,
) -> Result<(RgbImage, DepthImage), ResizeError> {
    if color.width() == 0 || color.height() == 0 {
        return Err(ResizeError::EmptySource {
            width: color.width(),
            height: color.height(),
        });
    }

    let plan = ResizePlan::new(depth.width(), depth.height(), target)?;
    let (w, h) = (plan.resized_width, plan.resized_height);

    let color = resize_bilinear_rgb(color, w, h);
    let depth = resize_nearest_depth(depth, w, h);

    let color = imageops::crop_imm(&color, plan.crop_x, plan.crop_y, target.width, target.height).to_image();
    let depth = imageops::crop_imm(&depth, plan.crop_x, plan.crop_y, target.width, target.height).to_image();
    Ok((color, depth))
}

#[derive(Debug, Clone, Copy)]
struct LinearTap {
    i0: usize,
    i1: usize,
    l0: f32,
    l1: f32,
}

fn linear_taps(in_size: u32, out_size: u32) -> Vec<LinearTap> {
    let last = in_size as usize - 1;
    let scale = in_size as f32 / out_size as f32;
    (0..out_size)
        .map(|dst| {
            let src = (scale * (dst as f32 + 0.5) - 0.5).max(0.0);
            let i0 = (src as usize).min(last);
            let i1 = if i0 < last { i0 + 1 } else { i0 };
            let l1 = (src - i0 as f32).clamp(0.0, 1.0);
            LinearTap {
                i0,
                i1,
                l0: 1.0 - l1,
                l1,
            }
        })
        .collect()
}

fn nearest_indices(in_size: u32, out_size: u32) -> Vec<usize> {
    let last = in_size as usize - 1;
    if in_size == out_size {
        return (0..out_size as usize).collect();
    }
    if out_size == in_size * 2 {
        return (0..out_size as usize).map(|i| i >> 1).collect();
    }
    let scale = in_size as f32 / out_size as f32;
    (0..out_size)
        .map(|dst| ((dst as f32 * scale).floor() as usize).min(last))
        .collect()
}

/// Bilinear resize of an 8-bit RGB image. Results are truncated, not rounded.
pub fn resize_bilinear_rgb(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
        return RgbImage::new(width, height);
    }

    let xs = linear_taps(src.width(), width);
    let ys = linear_taps(src.height(), height);
    let stride = src.width() as usize * 3;
    let raw = src.as_raw();

    let mut dst = RgbImage::new(width, height);
    dst.par_chunks_mut(width as usize * 3)
        .zip(ys.par_iter())
        .for_each(|(row, ty)| {
            let r0 = &raw[ty.i0 * stride..(ty.i0 + 1) * stride];
            let r1 = &raw[ty.i1 * stride..(ty.i1 + 1) * stride];
            for (x, tx) in xs.iter().enumerate() {
                for c in 0..3 {
                    let v00 = r0[tx.i0 * 3 + c] as f32;
                    let v01 = r0[tx.i1 * 3 + c] as f32;
                    let v10 = r1[tx.i0 * 3 + c] as f32;
                    let v11 = r1[tx.i1 * 3 + c] as f32;
                    let v = ty.l0 * (tx.l0 * v00 + tx.l1 * v01) + ty.l1 * (tx.l0 * v10 + tx.l1 * v11);
                    row[x * 3 + c] = v.clamp(0.0, 255.0) as u8;
                }
            }
        });
    dst
}

/// Nearest-neighbor resize of a 16-bit depth image.
pub fn resize_nearest_depth(src: &DepthImage, width: u32, height: u32) -> DepthImage {
    if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
        return DepthImage::new(width, height);
    }

    let xs = nearest_indices(src.width(), width);
    let ys = nearest_indices(src.height(), height);
    let stride = src.width() as usize;
    let raw = src.as_raw();

    let mut dst = DepthImage::new(width, height);
    dst.par_chunks_mut(width as usize)
        .zip(ys.par_iter())
        .for_each(|(row, &sy)| {
            let src_row = &raw[sy * stride..(sy + 1) * stride];
            for (out, &sx) in row.iter_mut().zip(xs.iter()) {
                *out = src_row[sx];
            }
        });
    dst
}
