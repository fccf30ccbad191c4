//! Resize/crop a color and depth pair the way the preprocessor does
//!
//! Usage:
//!   cargo run --example resize_preview -- <color.jpg> <depth.png> <out_dir> [size]

use recon::data::ResizeSpec;
use recon::pipeline::ingest::{FramePair, ResizePlan};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(color), Some(depth), Some(out_dir)) = (args.next(), args.next(), args.next()) else {
        return Err("usage: resize_preview <color> <depth> <out_dir> [size]".into());
    };
    let size: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(448);
    let spec = ResizeSpec::square(size);

    let frame = FramePair::load(&PathBuf::from(color), &PathBuf::from(depth))?;
    let (width, height) = frame.dimensions();
    let plan = ResizePlan::new(width, height, spec)?;
    info!(
        "{}x{} -> {}x{}, crop at ({}, {})",
        width, height, plan.resized_width, plan.resized_height, plan.crop_x, plan.crop_y
    );

    let out_dir = PathBuf::from(out_dir);
    std::fs::create_dir_all(&out_dir)?;
    let resized = frame.resized(spec)?;
    resized.save(&out_dir.join("color.png"), &out_dir.join("depth.png"))?;
    info!("Wrote {}", out_dir.display());
    Ok(())
}
