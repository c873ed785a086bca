//! Viewer pose and projection
//!
//! Besides the usual matrices the camera remembers the room it was found in
//! last frame, which seeds the next frame's room search.

use crate::core::types::{Mat3, Mat4, Quat, Vec3};
use crate::math::{Plane, ViewFrustum};
use crate::world::RoomId;

/// Perspective camera
pub struct Camera {
    /// World position
    pub position: Vec3,
    /// Orientation; identity looks down -Z with +Y up
    pub rotation: Quat,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Room that held the camera last frame
    pub current_room: Option<RoomId>,
}

impl Camera {
    pub fn new(position: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 0.01,
            far: 1000.0,
            current_room: None,
        }
    }

    /// 60 degree camera at `position` facing `target`
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let mut camera = Self::new(position, 60.0, 16.0 / 9.0);
        camera.face(target, up);
        camera
    }

    /// Turn to face `target`. Leaves the rotation alone when `target` is
    /// the camera position or lies along `up`.
    pub fn face(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize_or_zero();
        let right = forward.cross(up).normalize_or_zero();
        if right == Vec3::ZERO {
            return;
        }
        let up = right.cross(forward);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, up, -forward));
    }

    /// Set near and far clip distances
    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// World to camera space
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.rotation.conjugate()) * Mat4::from_translation(-self.position)
    }

    /// Camera to clip space, 0..1 depth
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// The camera's native (unclipped) view frustum in world space
    pub fn view_frustum(&self) -> ViewFrustum {
        ViewFrustum::from_view_projection(&self.view_projection())
    }

    /// Near half-space: points in front of the near plane have positive distance
    pub fn near_plane(&self) -> Plane {
        let forward = self.forward();
        Plane::from_point_normal(self.position + forward * self.near, forward)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0)
    }
}
