//! Binary pose file (`images.bin`) reading and writing

mod image_pose;
mod loader;

pub use image_pose::{ImagePose, PointObservation};
pub use loader::{count_poses, read_pose_file, write_pose_file};
