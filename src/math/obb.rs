//! Oriented bounding box used for per-object visibility tests

use crate::core::types::{Vec3, Mat4};
use super::aabb::Aabb;

/// Box described by a center and three half-axes (scaled, not normalized)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obb {
    pub center: Vec3,
    pub half_axes: [Vec3; 3],
}

impl Obb {
    /// Place a local-space AABB with an object transform
    pub fn from_aabb(local: &Aabb, transform: &Mat4) -> Self {
        let half = local.half_extent();
        Self {
            center: transform.transform_point3(local.center()),
            half_axes: [
                transform.transform_vector3(Vec3::X * half.x),
                transform.transform_vector3(Vec3::Y * half.y),
                transform.transform_vector3(Vec3::Z * half.z),
            ],
        }
    }

    /// Half-length of the box projected onto `direction` (unit normal)
    pub fn projected_radius(&self, direction: Vec3) -> f32 {
        self.half_axes.iter().map(|a| a.dot(direction).abs()).sum()
    }
}
