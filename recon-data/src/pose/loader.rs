//! Pose file loading and writing functions
//!
//! Layout (little-endian): `u64` image count, then per image `i32` image id,
//! `f64 x4` quaternion (w, x, y, z), `f64 x3` translation, `i32` camera id,
//! NUL-terminated name, `u64` keypoint count, and per keypoint `f64 x2`
//! position plus `i64` point id.

use crate::DataError;
use crate::pose::{ImagePose, PointObservation};
use glam::{DQuat, DVec2, DVec3};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

fn read_array<const N: usize, R: Read>(reader: &mut R, what: &'static str) -> Result<[u8; N], DataError> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => DataError::Truncated(what),
        _ => DataError::Io(e),
    })?;
    Ok(buf)
}

fn read_u64<R: Read>(reader: &mut R, what: &'static str) -> Result<u64, DataError> {
    Ok(u64::from_le_bytes(read_array(reader, what)?))
}

fn read_i64<R: Read>(reader: &mut R, what: &'static str) -> Result<i64, DataError> {
    Ok(i64::from_le_bytes(read_array(reader, what)?))
}

fn read_u32<R: Read>(reader: &mut R, what: &'static str) -> Result<u32, DataError> {
    Ok(u32::from_le_bytes(read_array(reader, what)?))
}

fn read_f64<R: Read>(reader: &mut R, what: &'static str) -> Result<f64, DataError> {
    Ok(f64::from_le_bytes(read_array(reader, what)?))
}

fn read_name<R: BufRead>(reader: &mut R) -> Result<String, DataError> {
    let mut bytes = Vec::new();
    reader.read_until(0, &mut bytes)?;
    if bytes.pop() != Some(0) {
        return Err(DataError::Truncated("image name"));
    }
    String::from_utf8(bytes).map_err(|e| DataError::InvalidName(e.to_string()))
}

fn read_image<R: BufRead>(reader: &mut R) -> Result<ImagePose, DataError> {
    let image_id = read_u32(reader, "image id")?;
    let qw = read_f64(reader, "rotation")?;
    let qx = read_f64(reader, "rotation")?;
    let qy = read_f64(reader, "rotation")?;
    let qz = read_f64(reader, "rotation")?;
    let tx = read_f64(reader, "translation")?;
    let ty = read_f64(reader, "translation")?;
    let tz = read_f64(reader, "translation")?;
    let camera_id = read_u32(reader, "camera id")?;
    let name = read_name(reader)?;

    let num_points = read_u64(reader, "keypoint count")?;
    let mut observations = Vec::new();
    for _ in 0..num_points {
        let x = read_f64(reader, "keypoint")?;
        let y = read_f64(reader, "keypoint")?;
        let point3d_id = read_i64(reader, "keypoint")?;
        observations.push(PointObservation {
            xy: DVec2::new(x, y),
            point3d_id,
        });
    }

    Ok(ImagePose {
        image_id,
        rotation: DQuat::from_xyzw(qx, qy, qz, qw),
        translation: DVec3::new(tx, ty, tz),
        camera_id,
        name,
        observations,
    })
}

/// Read every registered image pose from a pose file, keyed by image id.
///
/// A repeated image id keeps the last record.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_pose_file(path: &Path) -> Result<BTreeMap<u32, ImagePose>, DataError> {
    debug!("Reading poses from: {}", path.display());
    let mut reader = BufReader::new(File::open(path)?);

    let count = read_u64(&mut reader, "image count")?;
    let mut poses = BTreeMap::new();
    for _ in 0..count {
        let pose = read_image(&mut reader)?;
        if let Some(previous) = poses.insert(pose.image_id, pose) {
            warn!("Duplicate image id {} in pose file", previous.image_id);
        }
    }

    debug!("Read {} poses", poses.len());
    Ok(poses)
}

/// Number of distinct registered images in a pose file.
pub fn count_poses(path: &Path) -> Result<usize, DataError> {
    Ok(read_pose_file(path)?.len())
}

/// Write poses in the engine's binary layout.
pub fn write_pose_file(path: &Path, poses: &[ImagePose]) -> Result<(), DataError> {
    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(&(poses.len() as u64).to_le_bytes())?;
    for pose in poses {
        if pose.name.as_bytes().contains(&0) {
            return Err(DataError::InvalidName(pose.name.clone()));
        }
        let q = pose.rotation;
        writer.write_all(&pose.image_id.to_le_bytes())?;
        for v in [q.w, q.x, q.y, q.z] {
            writer.write_all(&v.to_le_bytes())?;
        }
        for v in pose.translation.to_array() {
            writer.write_all(&v.to_le_bytes())?;
        }
        writer.write_all(&pose.camera_id.to_le_bytes())?;
        writer.write_all(pose.name.as_bytes())?;
        writer.write_all(&[0])?;
        writer.write_all(&(pose.observations.len() as u64).to_le_bytes())?;
        for obs in &pose.observations {
            writer.write_all(&obs.xy.x.to_le_bytes())?;
            writer.write_all(&obs.xy.y.to_le_bytes())?;
            writer.write_all(&obs.point3d_id.to_le_bytes())?;
        }
    }

    writer.flush()?;
    Ok(())
}
