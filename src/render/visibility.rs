//! Room/portal visibility walk
//!
//! Starting from the room that holds the camera, every portal is clipped
//! against the frustum it was seen through. Rooms reached this way are put on
//! the [`RenderList`] and each successful clip leaves a frustum in the
//! destination room's chain. A room is expanded only the first time it is
//! reached; later clips into it still register their frustum.

use crate::core::Camera;
use crate::world::{Portal, RoomId, World};

use super::frustum::{CameraView, FrustumId, FrustumManager};
use super::render_list::RenderList;

/// Build this frame's render list and frustum chains.
///
/// Clears `list` and resets `frustums` first. Updates
/// `camera.current_room` and returns it.
pub fn gen_world_list(
    world: &World,
    camera: &mut Camera,
    frustums: &mut FrustumManager,
    list: &mut RenderList,
) -> Option<RoomId> {
    list.clear();
    frustums.reset();

    let view = CameraView::from_camera(camera);
    let camera_room = world.find_room_coherent(camera.position, camera.current_room);
    camera.current_room = camera_room;

    let mut walker = Walker {
        world,
        view,
        camera_room,
        frustums,
        list,
    };
    match camera_room {
        Some(room) => walker.walk_from(room),
        None => walker.scan_all(),
    }
    camera_room
}

struct Walker<'a> {
    world: &'a World,
    view: CameraView,
    camera_room: Option<RoomId>,
    frustums: &'a mut FrustumManager,
    list: &'a mut RenderList,
}

impl Walker<'_> {
    fn walk_from(&mut self, start: RoomId) {
        let world = self.world;
        let Some(room) = world.room(start) else {
            return;
        };
        // The camera room is listed with an empty (unrestricted) chain
        self.list.add_room(room, self.view.position);

        for portal in &room.portals {
            if !self.is_open(portal) {
                continue;
            }
            let Some(frustum) = self.frustums.clip_portal(portal, None, &self.view) else {
                continue;
            };
            if self.enter(portal) {
                self.process_room(portal, frustum);
            }
        }
    }

    /// Expand the room `portal` leads into, clipping its portals against
    /// the frustum the room was entered through.
    fn process_room(&mut self, entry: &Portal, frustum: FrustumId) {
        let world = self.world;
        let Some(room) = world.room(entry.dest) else {
            return;
        };
        for portal in &room.portals {
            if portal.dest == entry.source || !self.is_open(portal) {
                continue;
            }
            let Some(next) = self.frustums.clip_portal(portal, Some(frustum), &self.view) else {
                continue;
            };
            if self.enter(portal) {
                self.process_room(portal, next);
            }
        }
    }

    /// Portals into inactive rooms or back into the camera room are skipped
    fn is_open(&self, portal: &Portal) -> bool {
        if Some(portal.dest) == self.camera_room {
            return false;
        }
        self.world.room(portal.dest).is_some_and(|r| r.active)
    }

    /// List the destination room; true when it was reached for the first time
    fn enter(&mut self, portal: &Portal) -> bool {
        match self.world.room(portal.dest) {
            Some(room) => self.list.add_room(room, self.view.position),
            None => false,
        }
    }

    /// No room holds the camera: list every active room in view
    fn scan_all(&mut self) {
        log::debug!("camera outside all rooms, scanning {} rooms", self.world.room_count());
        for room in &self.world.rooms {
            if room.active && self.view.frustum.intersects_aabb(&room.bounds) {
                self.list.add_room(room, self.view.position);
            }
        }
    }
}
