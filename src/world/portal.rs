//! Portals: planar openings between two rooms

use glam::Vec3;

use crate::core::types::Result;
use crate::core::Error;
use crate::math::polygon;
use crate::math::Plane;

use super::room::RoomId;

/// Most vertices a portal polygon may have
pub const MAX_PORTAL_VERTICES: usize = 16;

/// Directed opening from `source` into `dest`
#[derive(Clone, Debug, PartialEq)]
pub struct Portal {
    pub source: RoomId,
    pub dest: RoomId,
    /// Convex, planar vertex ring in world space
    pub vertices: Vec<Vec3>,
    /// Portal plane; its normal faces into the source room
    pub plane: Plane,
}

impl Portal {
    /// Create a portal, orienting its plane so `source_point` (any point
    /// inside the source room) lies on the positive side.
    pub fn new(source: RoomId, dest: RoomId, vertices: Vec<Vec3>, source_point: Vec3) -> Result<Self> {
        if vertices.len() < 3 || vertices.len() > MAX_PORTAL_VERTICES {
            return Err(Error::InvalidPortal(format!(
                "portal {source:?} -> {dest:?} has {} vertices (expected 3..={MAX_PORTAL_VERTICES})",
                vertices.len()
            )));
        }
        let Some(mut plane) = polygon::polygon_plane(&vertices) else {
            return Err(Error::InvalidPortal(format!(
                "portal {source:?} -> {dest:?} has no area"
            )));
        };
        if plane.distance_to_point(source_point) < 0.0 {
            plane = plane.flipped();
        }

        Ok(Self {
            source,
            dest,
            vertices,
            plane,
        })
    }

    /// True when the camera sees the side of the portal facing the source room
    pub fn faces(&self, point: Vec3) -> bool {
        self.plane.distance_to_point(point) > -polygon::SPLIT_EPSILON
    }
}
