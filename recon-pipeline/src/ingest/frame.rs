//! Color/depth frame pairs and their on-disk encoding

use crate::PipelineError;
use crate::ingest::resize_and_crop;
use image::{DynamicImage, ImageBuffer, Luma, RgbImage};
use recon_data::ResizeSpec;
use std::path::Path;

/// Single-channel 16-bit depth raster.
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// A color image and the depth map captured with it.
#[derive(Debug, Clone)]
pub struct FramePair {
    pub color: RgbImage,
    pub depth: DepthImage,
}

impl FramePair {
    pub fn new(color: RgbImage, depth: DepthImage) -> Self {
        Self { color, depth }
    }

    /// Load a color image and its depth map from disk.
    pub fn load(color_path: &Path, depth_path: &Path) -> Result<Self, PipelineError> {
        let color = image::open(color_path)?.into_rgb8();
        let depth = load_depth(depth_path)?;
        Ok(Self { color, depth })
    }

    /// Resize and center-crop both rasters to `target`.
    pub fn resized(&self, target: ResizeSpec) -> Result<Self, PipelineError> {
        let (color, depth) = resize_and_crop(&self.color, &self.depth, target)?;
        Ok(Self { color, depth })
    }

    /// Write color as 8-bit and depth as 16-bit images; the format follows the extension.
    pub fn save(&self, color_path: &Path, depth_path: &Path) -> Result<(), PipelineError> {
        self.color.save(color_path)?;
        self.depth.save(depth_path)?;
        Ok(())
    }

    /// Depth dimensions (width, height); resize geometry is planned from these.
    pub fn dimensions(&self) -> (u32, u32) {
        self.depth.dimensions()
    }
}

/// Load a depth map without rescaling its values.
///
/// 8-bit single-channel maps are widened as-is; anything with color channels is rejected.
pub fn load_depth(path: &Path) -> Result<DepthImage, PipelineError> {
    match image::open(path)? {
        DynamicImage::ImageLuma16(depth) => Ok(depth),
        DynamicImage::ImageLuma8(depth) => {
            let (w, h) = depth.dimensions();
            let widened = depth.into_raw().into_iter().map(u16::from).collect();
            DepthImage::from_raw(w, h, widened)
                .ok_or_else(|| PipelineError::UnsupportedDepth(format!("{w}x{h} buffer size mismatch")))
        }
        other => Err(PipelineError::UnsupportedDepth(format!(
            "{:?} in {}",
            other.color(),
            path.display()
        ))),
    }
}
