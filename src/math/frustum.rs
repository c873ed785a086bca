//! Planes and the camera's native view frustum
//!
//! Every culling test in the crate runs against a plain set of planes, so the
//! same routines serve the camera frustum and the portal-clipped frustums built
//! by the renderer.

use crate::core::types::{Vec3, Vec4, Mat4};
use super::aabb::Aabb;
use super::obb::Obb;

/// A plane defined by normal and distance from origin
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Plane through `point` with the given (not necessarily unit) normal
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self { normal, distance: -normal.dot(point) }
    }

    /// Plane through three points, normal following the a→b→c winding
    /// (right-handed). Returns `None` for collinear input.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Option<Self> {
        let normal = (b - a).cross(c - a);
        if normal.length_squared() <= f32::EPSILON * f32::EPSILON {
            return None;
        }
        Some(Self::from_point_normal(a, normal))
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Same plane facing the other way
    pub fn flipped(&self) -> Self {
        Self { normal: -self.normal, distance: -self.distance }
    }
}

/// True if the point is on the positive side of every plane
pub fn planes_contain_point(planes: &[Plane], point: Vec3) -> bool {
    planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
}

/// Conservative AABB test against a convex plane set
pub fn planes_intersect_aabb(planes: &[Plane], aabb: &Aabb) -> bool {
    for plane in planes {
        // Find the corner most aligned with plane normal (p-vertex)
        let p = Vec3::new(
            if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
            if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
            if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
        );

        // If p-vertex is outside, AABB is completely outside
        if plane.distance_to_point(p) < 0.0 {
            return false;
        }
    }
    true
}

/// Conservative OBB test against a convex plane set
pub fn planes_intersect_obb(planes: &[Plane], obb: &Obb) -> bool {
    planes.iter().all(|plane| {
        let radius = obb.projected_radius(plane.normal);
        plane.distance_to_point(obb.center) >= -radius
    })
}

/// View frustum with 6 planes (Near, Far, Left, Right, Top, Bottom)
#[derive(Clone, Copy, Debug)]
pub struct ViewFrustum {
    pub planes: [Plane; 6],
}

impl ViewFrustum {
    /// Extract frustum planes from a view-projection matrix with 0..1 clip depth
    /// (glam `*_rh` projections).
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();
        let row = |r: usize| Vec4::new(m[0][r], m[1][r], m[2][r], m[3][r]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        // Near is row2 alone for 0..1 depth; the rest are the usual row3 ± rowN
        let near = Self::normalize_plane(r2);
        let far = Self::normalize_plane(r3 - r2);
        let left = Self::normalize_plane(r3 + r0);
        let right = Self::normalize_plane(r3 - r0);
        let top = Self::normalize_plane(r3 - r1);
        let bottom = Self::normalize_plane(r3 + r1);

        Self {
            planes: [near, far, left, right, top, bottom],
        }
    }

    fn normalize_plane(plane: Vec4) -> Plane {
        let normal = Vec3::new(plane.x, plane.y, plane.z);
        let len = normal.length();
        if len <= 0.0 {
            return Plane::new(Vec3::ZERO, 0.0);
        }
        Plane {
            normal: normal / len,
            distance: plane.w / len,
        }
    }

    /// Check if point is inside frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        planes_contain_point(&self.planes, point)
    }

    /// Check if AABB intersects frustum (conservative test)
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        planes_intersect_aabb(&self.planes, aabb)
    }

    /// Check if OBB intersects frustum (conservative test)
    pub fn intersects_obb(&self, obb: &Obb) -> bool {
        planes_intersect_obb(&self.planes, obb)
    }
}
