//! Rooms: static nodes of the level graph

use glam::Mat4;

use crate::math::Aabb;

use super::entity::EntityId;
use super::mesh::{MeshId, StaticMesh};
use super::portal::Portal;

/// Unique identifier for a room; also its index in `World::rooms`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u32);

impl RoomId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-room flags read by the renderer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoomFlags {
    /// Sky is visible from this room
    pub skybox: bool,
}

/// A room of the level
#[derive(Clone, Debug)]
pub struct Room {
    pub id: RoomId,
    /// World-space bounds
    pub bounds: Aabb,
    pub transform: Mat4,
    pub mesh: Option<MeshId>,
    /// Portals leading out of this room
    pub portals: Vec<Portal>,
    pub static_meshes: Vec<StaticMesh>,
    /// Entities currently overlapping this room
    pub entities: Vec<EntityId>,
    pub flags: RoomFlags,
    /// Inactive rooms (e.g. flipped-out alternates) are never drawn
    pub active: bool,
}

impl Room {
    pub fn new(id: RoomId, bounds: Aabb) -> Self {
        Self {
            id,
            bounds,
            transform: Mat4::IDENTITY,
            mesh: None,
            portals: Vec::new(),
            static_meshes: Vec::new(),
            entities: Vec::new(),
            flags: RoomFlags::default(),
            active: true,
        }
    }

    pub fn contains_point(&self, point: glam::Vec3) -> bool {
        self.bounds.contains_point(point)
    }
}
