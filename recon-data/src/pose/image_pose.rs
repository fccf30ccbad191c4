use glam::{DQuat, DVec2, DVec3};

/// A 2D keypoint of a registered image and the 3D point it observes, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointObservation {
    pub xy: DVec2,
    /// Index into the sparse point cloud, `-1` when untriangulated.
    pub point3d_id: i64,
}

/// Extrinsic pose of one registered image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePose {
    pub image_id: u32,
    /// World-to-camera rotation.
    pub rotation: DQuat,
    /// World-to-camera translation.
    pub translation: DVec3,
    pub camera_id: u32,
    pub name: String,
    pub observations: Vec<PointObservation>,
}

impl ImagePose {
    /// Pose without keypoint observations.
    pub fn new(image_id: u32, rotation: DQuat, translation: DVec3, camera_id: u32, name: impl Into<String>) -> Self {
        Self {
            image_id,
            rotation,
            translation,
            camera_id,
            name: name.into(),
            observations: Vec::new(),
        }
    }

    /// Camera center in world coordinates.
    pub fn center(&self) -> DVec3 {
        -(self.rotation.inverse() * self.translation)
    }
}
