//! Registered-pose report for a results root
//!
//! Prints, per scene, the number of registered images, the quality class and
//! the extent of the recovered camera centers.
//!
//! Usage:
//!   cargo run --example quality_report -- <results_root>

use glam::DVec3;
use recon::data::read_pose_file;
use recon::pipeline::quality::{QualityGate, discover_scenes, pose_file_path};
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("Please provide a results root")?;

    let gate = QualityGate::default();
    let scenes = discover_scenes(&root, "scene")?;
    info!("Found {} scenes under {}", scenes.len(), root.display());

    for scene in &scenes {
        let pose_file = pose_file_path(&root.join(scene));
        if !pose_file.exists() {
            println!("{scene}: no reconstruction");
            continue;
        }
        let poses = match read_pose_file(&pose_file) {
            Ok(poses) => poses,
            Err(e) => {
                warn!("Could not read {}: {}", pose_file.display(), e);
                continue;
            }
        };

        let (min, max) = poses.values().map(|p| p.center()).fold(
            (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
            |(min, max), c| (min.min(c), max.max(c)),
        );
        let extent = if poses.is_empty() { DVec3::ZERO } else { max - min };
        println!(
            "{scene}: {} images ({}), camera extent {:.2} x {:.2} x {:.2}",
            poses.len(),
            gate.classify(poses.len()),
            extent.x,
            extent.y,
            extent.z
        );
    }

    Ok(())
}
