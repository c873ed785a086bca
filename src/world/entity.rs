//! Entities placed in rooms

use glam::Mat4;

use crate::math::{Aabb, Obb};

use super::mesh::MeshId;

/// Unique identifier for an entity in the [`World`](super::World).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

/// One bone of a skeletal model, already posed for this frame
#[derive(Clone, Debug)]
pub struct BoneTag {
    pub mesh: MeshId,
    /// Bone-to-model transform for the current pose
    pub full_transform: Mat4,
}

/// An animated object. Posing happens elsewhere; the renderer only reads
/// the result.
#[derive(Clone, Debug)]
pub struct Entity {
    pub transform: Mat4,
    /// Local-space visibility box
    pub bounds: Aabb,
    pub bones: Vec<BoneTag>,
    pub visible: bool,
    /// Set by the world when any bone mesh carries transparent polygons
    pub has_transparency: bool,
}

impl Entity {
    pub fn new(transform: Mat4, bounds: Aabb, bones: Vec<BoneTag>) -> Self {
        Self {
            transform,
            bounds,
            bones,
            visible: true,
            has_transparency: false,
        }
    }

    /// World-space oriented box
    pub fn obb(&self) -> Obb {
        Obb::from_aabb(&self.bounds, &self.transform)
    }

    /// Model transform of one bone
    pub fn bone_transform(&self, bone: &BoneTag) -> Mat4 {
        self.transform * bone.full_transform
    }
}
