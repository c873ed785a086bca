//! Frame driver: visibility walk, object culling and transparency sorting
//!
//! Per frame, in order:
//! 1. [`Renderer::gen_world_list`] finds the visible rooms and their frustums
//! 2. [`Renderer::visible_objects`] culls statics and entities for the
//!    opaque pass
//! 3. [`Renderer::collect_transparency`] feeds transparent polygons into the
//!    BSP
//! 4. [`Renderer::build_transparent_draw_list`] emits the sorted draw sequence
//!
//! [`Renderer::render_frame`] runs all four.

use crate::core::types::Result;
use crate::core::Camera;
use crate::world::{EntityId, Mesh, Room, RoomId, World};

use super::bsp::{DrawOrder, DynamicBsp};
use super::config::RenderSettings;
use super::frustum::{CameraView, FrustumManager};
use super::render_list::RenderList;
use super::stats::{FrameStats, StatsHistory};
use super::visibility;

const STATS_HISTORY: usize = 120;

fn transparent(mesh: Option<&Mesh>) -> Option<&Mesh> {
    mesh.filter(|m| m.has_transparency())
}

/// Objects that passed culling this frame
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibleObjects {
    /// (room, index into `Room::static_meshes`)
    pub static_meshes: Vec<(RoomId, usize)>,
    /// Each visible entity once, character first
    pub entities: Vec<EntityId>,
}

impl VisibleObjects {
    fn clear(&mut self) {
        self.static_meshes.clear();
        self.entities.clear();
    }
}

/// Owns every frame-scoped structure of the visibility pipeline
pub struct Renderer {
    settings: RenderSettings,
    frustums: FrustumManager,
    list: RenderList,
    bsp: DynamicBsp,
    view: Option<CameraView>,
    camera_room: Option<RoomId>,
    visible: VisibleObjects,
    /// Entity dedupe for objects registered in several rooms
    entity_seen: Vec<bool>,
    stats: FrameStats,
    history: StatsHistory,
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            frustums: FrustumManager::new(settings.max_frustums),
            list: RenderList::new(0, settings.render_list_slack),
            bsp: DynamicBsp::new(settings.max_bsp_nodes, settings.max_bsp_polygons),
            view: None,
            camera_room: None,
            visible: VisibleObjects::default(),
            entity_seen: Vec::new(),
            stats: FrameStats::default(),
            history: StatsHistory::new(STATS_HISTORY),
            settings,
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Size the per-room and per-entity frame state for `world`
    pub fn set_world(&mut self, world: &World) {
        self.list.resize(world.room_count(), self.settings.render_list_slack);
        self.frustums.set_room_count(world.room_count());
        self.entity_seen = vec![false; world.entities.len()];
        self.view = None;
        self.camera_room = None;
        log::info!(
            "Renderer bound to world: {} rooms, {} entities, render list capacity {}",
            world.room_count(),
            world.entities.len(),
            self.list.capacity()
        );
    }

    /// Reset the frame, then walk rooms and portals from the camera.
    /// Returns the room holding the camera.
    pub fn gen_world_list(&mut self, world: &World, camera: &mut Camera) -> Option<RoomId> {
        // The walk clears the render list and frustums itself
        self.clear_objects();
        self.bsp.reset(&world.anim_sequences);

        let room = visibility::gen_world_list(world, camera, &mut self.frustums, &mut self.list);
        self.view = Some(CameraView::from_camera(camera));
        self.camera_room = room;
        room
    }

    /// Forget this frame's rooms, frustums and flags
    pub fn clean_list(&mut self) {
        self.list.clear();
        self.frustums.reset();
        self.clear_objects();
    }

    fn clear_objects(&mut self) {
        self.visible.clear();
        self.entity_seen.fill(false);
    }

    fn static_visible(&self, room: &Room, index: usize, view: &CameraView) -> bool {
        let Some(static_mesh) = room.static_meshes.get(index) else {
            return false;
        };
        if static_mesh.hidden && !self.settings.draw_dummy_statics {
            return false;
        }
        self.frustums.is_obb_visible_in_room(room.id, &static_mesh.obb(), view)
    }

    fn was_seen(seen: &[bool], id: EntityId) -> bool {
        seen.get(id.0 as usize).copied().unwrap_or(false)
    }

    fn mark_seen(seen: &mut Vec<bool>, id: EntityId) {
        let index = id.0 as usize;
        if index >= seen.len() {
            seen.resize(index + 1, false);
        }
        seen[index] = true;
    }

    /// Cull static meshes and entities of listed rooms against each room's
    /// frustum chain. Requires [`gen_world_list`](Self::gen_world_list).
    pub fn visible_objects(&mut self, world: &World) -> &VisibleObjects {
        self.clear_objects();
        let Some(view) = self.view else {
            return &self.visible;
        };

        if let Some(id) = world.character {
            Self::mark_seen(&mut self.entity_seen, id);
            if world.entity(id).is_some_and(|e| e.visible) {
                self.visible.entities.push(id);
            }
        }

        for room_id in self.list.rooms() {
            let Some(room) = world.room(room_id) else {
                continue;
            };
            for index in 0..room.static_meshes.len() {
                if self.static_visible(room, index, &view) {
                    self.visible.static_meshes.push((room_id, index));
                }
            }
            for &id in &room.entities {
                let Some(entity) = world.entity(id) else {
                    continue;
                };
                // Entities spanning rooms count once, in the first room that sees them
                if !entity.visible || Self::was_seen(&self.entity_seen, id) {
                    continue;
                }
                if self.frustums.is_obb_visible_in_room(room_id, &entity.obb(), &view) {
                    Self::mark_seen(&mut self.entity_seen, id);
                    self.visible.entities.push(id);
                }
            }
        }

        self.stats.static_meshes_visible = self.visible.static_meshes.len() as u32;
        self.stats.entities_visible = self.visible.entities.len() as u32;
        &self.visible
    }

    /// Feed transparent polygons of everything visible into the BSP.
    ///
    /// Room meshes go first since their large polygons make good splitters.
    /// The character is always collected.
    pub fn collect_transparency(&mut self, world: &World) {
        let Some(view) = self.view else {
            return;
        };
        let clip = view.frustum.planes;

        for room_id in self.list.rooms() {
            let Some(room) = world.room(room_id) else {
                continue;
            };
            if let Some(mesh) = transparent(room.mesh.and_then(|id| world.mesh(id))) {
                self.bsp.insert_polygons(&mesh.transparent_polygons, &room.transform, &clip);
            }
        }

        self.entity_seen.fill(false);
        if let Some(id) = world.character {
            Self::mark_seen(&mut self.entity_seen, id);
        }

        for room_id in self.list.rooms() {
            let Some(room) = world.room(room_id) else {
                continue;
            };
            for (index, static_mesh) in room.static_meshes.iter().enumerate() {
                let Some(mesh) = transparent(world.mesh(static_mesh.mesh)) else {
                    continue;
                };
                if self.static_visible(room, index, &view) {
                    self.bsp.insert_polygons(&mesh.transparent_polygons, &static_mesh.transform, &clip);
                }
            }

            for &id in &room.entities {
                let Some(entity) = world.entity(id) else {
                    continue;
                };
                if !entity.has_transparency || !entity.visible {
                    continue;
                }
                if Self::was_seen(&self.entity_seen, id) {
                    continue;
                }
                if !self.frustums.is_obb_visible_in_room(room_id, &entity.obb(), &view) {
                    continue;
                }
                Self::mark_seen(&mut self.entity_seen, id);
                for bone in &entity.bones {
                    if let Some(mesh) = transparent(world.mesh(bone.mesh)) {
                        self.bsp
                            .insert_polygons(&mesh.transparent_polygons, &entity.bone_transform(bone), &clip);
                    }
                }
            }
        }

        if let Some(character) = world.character.and_then(|id| world.entity(id)) {
            if character.has_transparency {
                for bone in &character.bones {
                    if let Some(mesh) = transparent(world.mesh(bone.mesh)) {
                        self.bsp
                            .insert_polygons(&mesh.transparent_polygons, &character.bone_transform(bone), &clip);
                    }
                }
            }
        }
    }

    /// Traverse the BSP from the camera and emit the draw sequence
    pub fn build_transparent_draw_list(&mut self, order: DrawOrder) {
        let Some(view) = self.view else {
            return;
        };
        self.bsp.traverse(view.position, order);
    }

    /// Run the whole pipeline for one frame
    pub fn render_frame(&mut self, world: &World, camera: &mut Camera) -> FrameStats {
        self.stats = FrameStats::default();
        self.gen_world_list(world, camera);
        self.visible_objects(world);
        self.collect_transparency(world);
        self.build_transparent_draw_list(self.settings.transparent_order);

        let stats = self.finish_stats();
        self.history.push(stats);
        stats
    }

    fn finish_stats(&mut self) -> FrameStats {
        let stats = &mut self.stats;
        stats.rooms_listed = self.list.len() as u32;
        stats.rooms_dropped = self.list.dropped();
        stats.frustums = self.frustums.len() as u32;
        stats.portals_rejected = self.frustums.rejected();
        stats.frustums_dropped = self.frustums.dropped();
        stats.bsp = self.bsp.stats();
        stats.draw_commands = self.bsp.commands().len() as u32;
        stats.draw_batches = self.bsp.batches().len() as u32;

        log::debug!(
            "frame: room {:?}, {} rooms, {} frustums, {} transparent polygons in {} batches",
            self.camera_room,
            stats.rooms_listed,
            stats.frustums,
            stats.draw_commands,
            stats.draw_batches
        );
        if stats.has_drops() {
            log::warn!(
                "capacity exceeded: {} rooms, {} frustums, {} polygons dropped",
                stats.rooms_dropped,
                stats.frustums_dropped,
                stats.bsp.dropped
            );
        }
        *stats
    }

    pub fn render_list(&self) -> &RenderList {
        &self.list
    }

    pub fn frustums(&self) -> &FrustumManager {
        &self.frustums
    }

    pub fn bsp(&self) -> &DynamicBsp {
        &self.bsp
    }

    pub fn camera_room(&self) -> Option<RoomId> {
        self.camera_room
    }

    /// Some listed room shows the sky
    pub fn draw_skybox(&self) -> bool {
        self.list.draw_skybox()
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn history(&self) -> &StatsHistory {
        &self.history
    }
}
