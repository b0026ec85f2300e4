use glam::{Mat4, Vec3};
use serde::Serialize;

/// Index of an actor inside `SceneState::actors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActorId(pub usize);

/// Fixed rotation expressed the way the scene was authored: an axis plus
/// degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRotation {
    pub axis: Vec3,
    pub degrees: f32,
}

impl AxisRotation {
    pub const fn new(axis: Vec3, degrees: f32) -> Self {
        Self { axis, degrees }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_axis_angle(self.axis.normalize(), self.degrees.to_radians())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorTransform {
    pub position: Vec3,
    pub scale: f32,
    /// Applied in order after translation and scale.
    pub rotations: Vec<AxisRotation>,
}

impl ActorTransform {
    pub fn new(position: Vec3, scale: f32) -> Self {
        Self {
            position,
            scale,
            rotations: Vec::new(),
        }
    }

    pub fn rotated(mut self, axis: Vec3, degrees: f32) -> Self {
        self.rotations.push(AxisRotation::new(axis, degrees));
        self
    }

    /// Model matrix composed translate -> scale -> rotate.
    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix_offset(Vec3::ZERO)
    }

    /// Model matrix for an instance placed `offset` away from this transform.
    pub fn model_matrix_offset(&self, offset: Vec3) -> Mat4 {
        let mut model = Mat4::from_translation(self.position + offset)
            * Mat4::from_scale(Vec3::splat(self.scale));
        for rotation in &self.rotations {
            model *= rotation.matrix();
        }
        model
    }
}
