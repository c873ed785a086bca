//! The static room/portal level graph and the objects placed in it
//!
//! Built once at level load; the renderer only reads it, except for
//! animated texture sequences which advance every frame.

pub mod anim;
pub mod entity;
pub mod mesh;
pub mod portal;
pub mod room;

pub use anim::{AnimSequence, AnimTextureType, TexFrame};
pub use entity::{BoneTag, Entity, EntityId};
pub use mesh::{BlendMode, Mesh, MeshId, PolygonAnim, StaticMesh, TexturedPolygon, Vertex};
pub use portal::Portal;
pub use room::{Room, RoomFlags, RoomId};

use glam::Vec3;

use crate::core::types::Result;
use crate::core::Error;
use crate::math::Aabb;

/// Level data: rooms, portals, shared meshes and entities
#[derive(Clone, Debug, Default)]
pub struct World {
    pub rooms: Vec<Room>,
    pub meshes: Vec<Mesh>,
    pub entities: Vec<Entity>,
    pub anim_sequences: Vec<AnimSequence>,
    /// Player entity; its transparency is always collected
    pub character: Option<EntityId>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a room with the given world-space bounds
    pub fn add_room(&mut self, bounds: Aabb) -> RoomId {
        let id = RoomId(self.rooms.len() as u32);
        self.rooms.push(Room::new(id, bounds));
        id
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.index())
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id.index())
    }

    fn room_checked(&mut self, id: RoomId) -> Result<&mut Room> {
        let count = self.rooms.len();
        self.rooms
            .get_mut(id.index())
            .ok_or_else(|| Error::InvalidRoom(format!("{id:?} out of range ({count} rooms)")))
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(mesh);
        id
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0 as usize)
    }

    fn check_mesh(&self, id: MeshId) -> Result<()> {
        if self.mesh(id).is_none() {
            return Err(Error::InvalidMesh(format!("{id:?} not loaded")));
        }
        Ok(())
    }

    pub fn set_room_mesh(&mut self, room: RoomId, mesh: MeshId) -> Result<()> {
        self.check_mesh(mesh)?;
        self.room_checked(room)?.mesh = Some(mesh);
        Ok(())
    }

    /// Add a one-way portal from `source` into `dest`
    pub fn add_portal(&mut self, source: RoomId, dest: RoomId, vertices: Vec<Vec3>) -> Result<()> {
        if source == dest {
            return Err(Error::InvalidPortal(format!("{source:?} links to itself")));
        }
        if self.room(dest).is_none() {
            return Err(Error::InvalidRoom(format!("portal target {dest:?} does not exist")));
        }
        let inside = self.room_checked(source)?.bounds.center();
        let portal = Portal::new(source, dest, vertices, inside)?;
        self.room_checked(source)?.portals.push(portal);
        Ok(())
    }

    /// Add portals in both directions through the same opening
    pub fn connect(&mut self, a: RoomId, b: RoomId, vertices: Vec<Vec3>) -> Result<()> {
        let mut reversed = vertices.clone();
        reversed.reverse();
        self.add_portal(a, b, vertices)?;
        self.add_portal(b, a, reversed)
    }

    pub fn add_static_mesh(&mut self, room: RoomId, static_mesh: StaticMesh) -> Result<()> {
        self.check_mesh(static_mesh.mesh)?;
        self.room_checked(room)?.static_meshes.push(static_mesh);
        Ok(())
    }

    /// Add an entity and register it in every listed room
    pub fn add_entity(&mut self, rooms: &[RoomId], mut entity: Entity) -> Result<EntityId> {
        for bone in &entity.bones {
            self.check_mesh(bone.mesh)?;
        }
        for &room in rooms {
            self.room_checked(room)?;
        }
        entity.has_transparency = entity
            .bones
            .iter()
            .any(|b| self.mesh(b.mesh).is_some_and(Mesh::has_transparency));

        let id = EntityId(self.entities.len() as u32);
        self.entities.push(entity);
        for &room in rooms {
            self.room_checked(room)?.entities.push(id);
        }
        Ok(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0 as usize)
    }

    pub fn set_character(&mut self, id: EntityId) -> Result<()> {
        if self.entity(id).is_none() {
            return Err(Error::InvalidEntity(format!("{id:?} does not exist")));
        }
        self.character = Some(id);
        Ok(())
    }

    pub fn add_anim_sequence(&mut self, sequence: AnimSequence) -> usize {
        self.anim_sequences.push(sequence);
        self.anim_sequences.len() - 1
    }

    /// Advance every animated texture sequence by `dt` seconds
    pub fn update_anim_textures(&mut self, dt: f32) {
        for sequence in &mut self.anim_sequences {
            sequence.update(dt);
        }
    }

    /// Find the active room containing `point`, searching the previous room
    /// and its portal neighbours before scanning every room.
    pub fn find_room_coherent(&self, point: Vec3, hint: Option<RoomId>) -> Option<RoomId> {
        if let Some(room) = hint.and_then(|id| self.room(id)) {
            if room.active && room.contains_point(point) {
                return Some(room.id);
            }
            for portal in &room.portals {
                if let Some(dest) = self.room(portal.dest) {
                    if dest.active && dest.contains_point(point) {
                        return Some(dest.id);
                    }
                }
            }
        }

        self.rooms
            .iter()
            .find(|r| r.active && r.contains_point(point))
            .map(|r| r.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doorway(x: f32) -> Vec<Vec3> {
        vec![
            Vec3::new(x, -1.0, -1.0),
            Vec3::new(x, 1.0, -1.0),
            Vec3::new(x, 1.0, 1.0),
            Vec3::new(x, -1.0, 1.0),
        ]
    }

    fn corridor() -> (World, RoomId, RoomId, RoomId) {
        let mut world = World::new();
        let a = world.add_room(Aabb::new(Vec3::new(0.0, -2.0, -2.0), Vec3::new(4.0, 2.0, 2.0)));
        let b = world.add_room(Aabb::new(Vec3::new(4.0, -2.0, -2.0), Vec3::new(8.0, 2.0, 2.0)));
        let c = world.add_room(Aabb::new(Vec3::new(8.0, -2.0, -2.0), Vec3::new(12.0, 2.0, 2.0)));
        world.connect(a, b, doorway(4.0)).unwrap();
        world.connect(b, c, doorway(8.0)).unwrap();
        (world, a, b, c)
    }

    #[test]
    fn test_connect_orients_both_sides() {
        let (world, a, b, _) = corridor();
        let ab = &world.room(a).unwrap().portals[0];
        let ba = &world.room(b).unwrap().portals[0];
        assert_eq!(ab.dest, b);
        assert_eq!(ba.dest, a);
        assert!(ab.plane.normal.abs_diff_eq(-Vec3::X, 1e-6));
        assert!(ba.plane.normal.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_invalid_links() {
        let (mut world, a, _, _) = corridor();
        assert!(matches!(world.add_portal(a, RoomId(99), doorway(0.0)), Err(Error::InvalidRoom(_))));
        assert!(matches!(world.add_portal(a, a, doorway(0.0)), Err(Error::InvalidPortal(_))));
        assert!(matches!(world.set_room_mesh(a, MeshId(3)), Err(Error::InvalidMesh(_))));
        assert!(world.set_character(EntityId(0)).is_err());
    }

    #[test]
    fn test_anim_textures_advance() {
        let (mut world, _, _, _) = corridor();
        let frames = vec![TexFrame::identity(5), TexFrame::identity(6)];
        let seq = world.add_anim_sequence(AnimSequence::new(AnimTextureType::Forward, 0.1, frames.clone()));
        let mut locked = AnimSequence::new(AnimTextureType::Forward, 0.1, frames);
        locked.frame_lock = true;
        let locked = world.add_anim_sequence(locked);

        world.update_anim_textures(0.15);
        assert_eq!(world.anim_sequences[seq].current_frame, 1);
        assert_eq!(world.anim_sequences[locked].current_frame, 0);
    }

    #[test]
    fn test_find_room_coherent() {
        let (mut world, a, b, c) = corridor();
        let in_c = Vec3::new(10.0, 0.0, 0.0);
        // Neighbour of the hint
        assert_eq!(world.find_room_coherent(Vec3::new(6.0, 0.0, 0.0), Some(a)), Some(b));
        // Not a neighbour: full scan
        assert_eq!(world.find_room_coherent(in_c, Some(a)), Some(c));
        assert_eq!(world.find_room_coherent(Vec3::splat(100.0), Some(a)), None);

        world.room_mut(c).unwrap().active = false;
        assert_eq!(world.find_room_coherent(in_c, None), None);
    }

    #[test]
    fn test_entity_transparency_flag() {
        let (mut world, a, b, _) = corridor();
        let glass = Mesh::new(vec![TexturedPolygon::from_positions(
            &[Vec3::ZERO, Vec3::X, Vec3::Y],
            BlendMode::Multiply,
            0,
        )])
        .unwrap();
        let mesh = world.add_mesh(glass);
        let bones = vec![BoneTag { mesh, full_transform: glam::Mat4::IDENTITY }];
        let id = world
            .add_entity(&[a, b], Entity::new(glam::Mat4::IDENTITY, Aabb::default(), bones))
            .unwrap();
        assert!(world.entity(id).unwrap().has_transparency);
        assert_eq!(world.room(a).unwrap().entities, vec![id]);
        assert_eq!(world.room(b).unwrap().entities, vec![id]);
    }
}
