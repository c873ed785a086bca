//! Per-frame list of rooms to draw
//!
//! Capacity is fixed when a world is bound (room count plus slack). Each room
//! appears at most once per frame; membership is tracked in a frame-local
//! bitmap rather than on the room itself.

use glam::Vec3;

use crate::world::{Room, RoomId};

/// One visible room
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderListEntry {
    pub room: RoomId,
    pub active: bool,
    /// Camera to room-centre distance when listed
    pub dist: f32,
}

/// Flat, frame-lifetime room list
#[derive(Debug, Default)]
pub struct RenderList {
    entries: Vec<RenderListEntry>,
    capacity: usize,
    in_list: Vec<bool>,
    draw_skybox: bool,
    dropped: u32,
    /// Sort keys for [`front_to_back`](Self::front_to_back), reused per call
    sort_keys: Vec<(f32, usize)>,
}

impl RenderList {
    pub fn new(room_count: usize, slack: usize) -> Self {
        let mut list = Self::default();
        list.resize(room_count, slack);
        list
    }

    /// Re-size for a newly bound world. Clears the list.
    pub fn resize(&mut self, room_count: usize, slack: usize) {
        self.capacity = room_count + slack;
        self.entries = Vec::with_capacity(self.capacity);
        self.in_list = vec![false; room_count];
        self.sort_keys = Vec::with_capacity(self.capacity);
        self.draw_skybox = false;
        self.dropped = 0;
    }

    /// Mark `room` as reached this frame and list it.
    ///
    /// Returns true only the first time a room is reached. Inactive rooms are
    /// never listed. When the list is full the room still counts as reached
    /// but its entry is dropped and counted.
    pub fn add_room(&mut self, room: &Room, camera_pos: Vec3) -> bool {
        if !room.active || self.contains(room.id) {
            return false;
        }
        let index = room.id.index();
        if index >= self.in_list.len() {
            self.in_list.resize(index + 1, false);
        }
        self.in_list[index] = true;

        if self.entries.len() >= self.capacity {
            self.dropped += 1;
            return true;
        }
        self.entries.push(RenderListEntry {
            room: room.id,
            active: true,
            dist: camera_pos.distance(room.bounds.center()),
        });
        if room.flags.skybox {
            self.draw_skybox = true;
        }
        true
    }

    pub fn contains(&self, room: RoomId) -> bool {
        self.in_list.get(room.index()).copied().unwrap_or(false)
    }

    /// Listed rooms in discovery order
    pub fn entries(&self) -> &[RenderListEntry] {
        &self.entries
    }

    pub fn rooms(&self) -> impl Iterator<Item = RoomId> + '_ {
        self.entries.iter().filter(|e| e.active).map(|e| e.room)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Some listed room shows the sky
    pub fn draw_skybox(&self) -> bool {
        self.draw_skybox
    }

    /// Rooms reached but not listed for lack of space this frame
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Empty the list and forget every room's membership
    pub fn clear(&mut self) {
        for entry in &self.entries {
            if let Some(flag) = self.in_list.get_mut(entry.room.index()) {
                *flag = false;
            }
        }
        // Dropped rooms never made it into `entries`
        if self.dropped > 0 {
            self.in_list.fill(false);
        }
        self.entries.clear();
        self.draw_skybox = false;
        self.dropped = 0;
    }

    /// Listed rooms sorted nearest first
    pub fn front_to_back(&mut self) -> Vec<RenderListEntry> {
        self.sort_keys.clear();
        self.sort_keys
            .extend(self.entries.iter().enumerate().map(|(i, e)| (e.dist, i)));
        self.sort_keys
            .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        self.sort_keys.iter().map(|&(_, i)| self.entries[i]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Aabb;

    fn room(id: u32, x: f32) -> Room {
        Room::new(RoomId(id), Aabb::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 2.0, 2.0, 2.0)))
    }

    #[test]
    fn test_add_once() {
        let mut list = RenderList::new(4, 0);
        let a = room(0, 0.0);
        assert!(list.add_room(&a, Vec3::ZERO));
        assert!(!list.add_room(&a, Vec3::ZERO));
        assert_eq!(list.len(), 1);
        assert!(list.contains(RoomId(0)));
        assert!(!list.contains(RoomId(1)));
        let e = list.entries()[0];
        assert!(e.active);
        assert!((e.dist - Vec3::new(1.0, 1.0, 1.0).length()).abs() < 1e-5);
    }

    #[test]
    fn test_inactive_and_skybox() {
        let mut list = RenderList::new(4, 0);
        let mut hidden = room(0, 0.0);
        hidden.active = false;
        assert!(!list.add_room(&hidden, Vec3::ZERO));
        assert!(list.is_empty());
        assert!(!list.draw_skybox());

        let mut sky = room(1, 4.0);
        sky.flags.skybox = true;
        list.add_room(&sky, Vec3::ZERO);
        assert!(list.draw_skybox());

        list.clear();
        assert!(list.is_empty());
        assert!(!list.draw_skybox());
        assert!(!list.contains(RoomId(1)));
    }

    #[test]
    fn test_full_list_counts_drop() {
        let mut list = RenderList::new(1, 0);
        assert!(list.add_room(&room(0, 0.0), Vec3::ZERO));
        // A room beyond the sized range still registers as reached
        assert!(list.add_room(&room(5, 4.0), Vec3::ZERO));
        assert_eq!(list.len(), 1);
        assert_eq!(list.dropped(), 1);
        assert!(list.contains(RoomId(5)));

        list.clear();
        assert!(!list.contains(RoomId(5)));
        assert_eq!(list.dropped(), 0);
    }

    #[test]
    fn test_front_to_back() {
        let mut list = RenderList::new(3, 0);
        list.add_room(&room(0, 20.0), Vec3::ZERO);
        list.add_room(&room(1, 0.0), Vec3::ZERO);
        list.add_room(&room(2, 10.0), Vec3::ZERO);
        let order: Vec<RoomId> = list.front_to_back().iter().map(|e| e.room).collect();
        assert_eq!(order, vec![RoomId(1), RoomId(2), RoomId(0)]);
        // Discovery order untouched
        assert_eq!(list.entries()[0].room, RoomId(0));
    }
}
