//! Portal frustums and the per-frame frustum manager
//!
//! Each time a portal survives clipping, the visible part of its polygon
//! becomes a new frustum: a vertex ring plus one plane per edge, every plane
//! passing through the camera. Frustums form a tree (parent → children) that
//! mirrors the portal path, and each destination room keeps its own chain of
//! incoming frustums for object culling.

use glam::Vec3;

use crate::core::Camera;
use crate::math::frustum::{planes_contain_point, planes_intersect_aabb, planes_intersect_obb};
use crate::math::polygon;
use crate::math::{Aabb, Obb, Plane, ViewFrustum};
use crate::world::{Portal, RoomId};

use slotmap::new_key_type;

use super::arena::{FrameArena, Recycle};

/// Most vertices a clipped frustum polygon may keep
pub const MAX_FRUSTUM_VERTICES: usize = 64;

new_key_type! {
    /// Frame-local handle to a [`Frustum`]; resolves to nothing after
    /// [`FrustumManager::reset`].
    pub struct FrustumId;
}

/// Camera state shared by every clip of one frame
#[derive(Clone, Copy, Debug)]
pub struct CameraView {
    pub position: Vec3,
    /// Points in front of the near plane have positive distance
    pub near: Plane,
    /// Native, unclipped view volume
    pub frustum: ViewFrustum,
}

impl CameraView {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            position: camera.position,
            near: camera.near_plane(),
            frustum: camera.view_frustum(),
        }
    }
}

/// The visible part of a portal as seen along one portal path
#[derive(Clone, Debug, Default)]
pub struct Frustum {
    /// Clipped portal polygon, world space
    pub vertices: Vec<Vec3>,
    /// One inward-facing plane per edge, all through the camera position
    pub planes: Vec<Plane>,
    /// Room seen through this frustum
    pub room: RoomId,
    /// Frustum this one was clipped against; `None` for the camera frustum
    pub parent: Option<FrustumId>,
    pub first_child: Option<FrustumId>,
    last_child: Option<FrustumId>,
    pub next_sibling: Option<FrustumId>,
    /// Next frustum in the destination room's incoming chain
    pub next_in_room: Option<FrustumId>,
    /// Number of portals between the camera and this frustum
    pub depth: u16,
}

impl Recycle for Frustum {
    fn recycle(&mut self) {
        self.vertices.clear();
        self.planes.clear();
        self.room = RoomId::default();
        self.parent = None;
        self.first_child = None;
        self.last_child = None;
        self.next_sibling = None;
        self.next_in_room = None;
        self.depth = 0;
    }
}

impl Frustum {
    pub fn contains_point(&self, point: Vec3) -> bool {
        planes_contain_point(&self.planes, point)
    }

    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        planes_intersect_aabb(&self.planes, aabb)
    }

    pub fn intersects_obb(&self, obb: &Obb) -> bool {
        planes_intersect_obb(&self.planes, obb)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct RoomChain {
    head: Option<FrustumId>,
    tail: Option<FrustumId>,
    active_frustums: u16,
}

/// Iterator over a linked run of frustums
pub struct FrustumChain<'a> {
    arena: &'a FrameArena<FrustumId, Frustum>,
    next: Option<FrustumId>,
    link: fn(&Frustum) -> Option<FrustumId>,
}

impl<'a> Iterator for FrustumChain<'a> {
    type Item = (FrustumId, &'a Frustum);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let frustum = self.arena.get(id)?;
        self.next = (self.link)(frustum);
        Some((id, frustum))
    }
}

/// Owns every frustum of the current frame
pub struct FrustumManager {
    arena: FrameArena<FrustumId, Frustum>,
    chains: Vec<RoomChain>,
    roots: Vec<FrustumId>,
    clip: Vec<Vec3>,
    scratch: Vec<Vec3>,
    edge_planes: Vec<Plane>,
    rejected: u32,
    dropped: u32,
}

impl FrustumManager {
    /// Create a manager able to hold `capacity` frustums per frame
    pub fn new(capacity: usize) -> Self {
        Self {
            arena: FrameArena::with_capacity(capacity),
            chains: Vec::new(),
            roots: Vec::new(),
            clip: Vec::with_capacity(MAX_FRUSTUM_VERTICES),
            scratch: Vec::with_capacity(MAX_FRUSTUM_VERTICES),
            edge_planes: Vec::with_capacity(MAX_FRUSTUM_VERTICES),
            rejected: 0,
            dropped: 0,
        }
    }

    /// Size the per-room chains for a level
    pub fn set_room_count(&mut self, room_count: usize) {
        self.chains.clear();
        self.chains.resize(room_count, RoomChain::default());
    }

    /// Rewind the arena and empty every room chain. [`FrustumId`]s handed
    /// out before this call no longer resolve.
    pub fn reset(&mut self) {
        self.arena.reset();
        self.chains.fill(RoomChain::default());
        self.roots.clear();
        self.rejected = 0;
        self.dropped = 0;
    }

    /// Clip `portal` against `parent` (or the camera's native frustum when
    /// `None`) and the camera near plane.
    ///
    /// Returns `None` when the portal faces away, clips to fewer than three
    /// vertices, or the arena is full; nothing is recorded in those cases.
    /// On success the new frustum is linked under its parent and appended to
    /// the destination room's chain.
    pub fn clip_portal(
        &mut self,
        portal: &Portal,
        parent: Option<FrustumId>,
        view: &CameraView,
    ) -> Option<FrustumId> {
        if !portal.faces(view.position) {
            log::trace!("portal {:?} -> {:?} faces away", portal.source, portal.dest);
            self.rejected += 1;
            return None;
        }

        let (bounds, depth): (&[Plane], u16) = match parent {
            Some(id) => {
                let parent_frustum = self.arena.get(id)?;
                (parent_frustum.planes.as_slice(), parent_frustum.depth + 1)
            }
            None => (&view.frustum.planes[..], 1),
        };

        self.clip.clear();
        self.clip.extend_from_slice(&portal.vertices);
        let visible = polygon::clip_polygon_by_planes(&mut self.clip, bounds, &mut self.scratch)
            && polygon::clip_polygon_by_planes(
                &mut self.clip,
                std::slice::from_ref(&view.near),
                &mut self.scratch,
            );
        if !visible || !self.build_edge_planes(view.position) {
            log::trace!("portal {:?} -> {:?} clipped away", portal.source, portal.dest);
            self.rejected += 1;
            return None;
        }
        if self.clip.len() > MAX_FRUSTUM_VERTICES {
            log::warn!(
                "portal {:?} -> {:?} clipped to {} vertices (max {MAX_FRUSTUM_VERTICES})",
                portal.source,
                portal.dest,
                self.clip.len()
            );
            self.dropped += 1;
            return None;
        }

        let Some((id, frustum)) = self.arena.alloc() else {
            self.dropped += 1;
            return None;
        };
        frustum.vertices.extend_from_slice(&self.clip);
        frustum.planes.extend_from_slice(&self.edge_planes);
        frustum.room = portal.dest;
        frustum.parent = parent;
        frustum.depth = depth;

        self.link_child(parent, id);
        self.link_room(portal.dest, id);
        Some(id)
    }

    /// One plane per edge of the clipped ring, through the eye, facing the
    /// ring's centroid. False when the ring is edge-on to the camera.
    fn build_edge_planes(&mut self, eye: Vec3) -> bool {
        self.edge_planes.clear();
        let centre = polygon::centroid(&self.clip);
        let n = self.clip.len();
        for i in 0..n {
            let a = self.clip[i];
            let b = self.clip[(i + 1) % n];
            let Some(mut plane) = Plane::from_points(eye, a, b) else {
                continue;
            };
            if plane.distance_to_point(centre) < 0.0 {
                plane = plane.flipped();
            }
            self.edge_planes.push(plane);
        }
        self.edge_planes.len() >= 3
    }

    fn link_child(&mut self, parent: Option<FrustumId>, id: FrustumId) {
        let Some(parent_id) = parent else {
            self.roots.push(id);
            return;
        };
        let last = self.arena.get(parent_id).and_then(|p| p.last_child);
        match last {
            Some(prev) => {
                if let Some(prev) = self.arena.get_mut(prev) {
                    prev.next_sibling = Some(id);
                }
            }
            None => {
                if let Some(p) = self.arena.get_mut(parent_id) {
                    p.first_child = Some(id);
                }
            }
        }
        if let Some(p) = self.arena.get_mut(parent_id) {
            p.last_child = Some(id);
        }
    }

    fn link_room(&mut self, room: RoomId, id: FrustumId) {
        if room.index() >= self.chains.len() {
            self.chains.resize(room.index() + 1, RoomChain::default());
        }
        let chain = &mut self.chains[room.index()];
        let prev_tail = chain.tail.replace(id);
        if chain.head.is_none() {
            chain.head = Some(id);
        }
        chain.active_frustums = chain.active_frustums.saturating_add(1);

        if let Some(prev) = prev_tail.and_then(|t| self.arena.get_mut(t)) {
            prev.next_in_room = Some(id);
        }
    }

    pub fn get(&self, id: FrustumId) -> Option<&Frustum> {
        self.arena.get(id)
    }

    /// Frustums through which `room` is seen this frame, in discovery order.
    /// Empty for the camera's room and for rooms not reached via portals.
    pub fn room_frustums(&self, room: RoomId) -> FrustumChain<'_> {
        FrustumChain {
            arena: &self.arena,
            next: self.chains.get(room.index()).and_then(|c| c.head),
            link: |f| f.next_in_room,
        }
    }

    /// Frustums clipped directly against `id`
    pub fn children(&self, id: FrustumId) -> FrustumChain<'_> {
        FrustumChain {
            arena: &self.arena,
            next: self.get(id).and_then(|f| f.first_child),
            link: |f| f.next_sibling,
        }
    }

    /// Frustums clipped against the camera frustum
    pub fn roots(&self) -> &[FrustumId] {
        &self.roots
    }

    pub fn active_frustums(&self, room: RoomId) -> u16 {
        self.chains.get(room.index()).map_or(0, |c| c.active_frustums)
    }

    /// Whether an OBB in `room` can be seen through any of the room's
    /// frustums; rooms with an empty chain use the camera frustum.
    pub fn is_obb_visible_in_room(&self, room: RoomId, obb: &Obb, view: &CameraView) -> bool {
        let mut chain = self.room_frustums(room).peekable();
        if chain.peek().is_none() {
            return view.frustum.intersects_obb(obb);
        }
        chain.any(|(_, f)| f.intersects_obb(obb))
    }

    /// Frustums allocated this frame
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Portals judged invisible this frame
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Visible portals lost to capacity limits this frame
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Camera at the origin looking down -Z through a portal at z = -5
    fn view() -> CameraView {
        let mut camera = Camera::look_at(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
        camera.aspect = 1.0;
        CameraView::from_camera(&camera)
    }

    fn portal(dest: u32, half: f32, z: f32) -> Portal {
        let vertices = vec![
            Vec3::new(-half, -half, z),
            Vec3::new(half, -half, z),
            Vec3::new(half, half, z),
            Vec3::new(-half, half, z),
        ];
        Portal::new(RoomId(0), RoomId(dest), vertices, Vec3::ZERO).unwrap()
    }

    fn manager() -> FrustumManager {
        let mut m = FrustumManager::new(16);
        m.set_room_count(4);
        m
    }

    #[test]
    fn test_clip_inside_view_keeps_portal() {
        let mut m = manager();
        let p = portal(1, 1.0, -5.0);
        let id = m.clip_portal(&p, None, &view()).unwrap();
        let f = m.get(id).unwrap();
        assert_eq!(f.vertices, p.vertices);
        assert_eq!(f.planes.len(), 4);
        assert_eq!(f.room, RoomId(1));
        assert_eq!(m.active_frustums(RoomId(1)), 1);
        assert_eq!(m.roots(), &[id]);

        // Planes pass through the eye and enclose the portal centre
        for plane in &f.planes {
            assert!(plane.distance_to_point(Vec3::ZERO).abs() < 1e-5);
        }
        assert!(f.contains_point(Vec3::new(0.0, 0.0, -10.0)));
        assert!(!f.contains_point(Vec3::new(5.0, 0.0, -10.0)));
        let beside = Aabb::new(Vec3::new(4.0, -0.5, -11.0), Vec3::new(5.0, 0.5, -10.0));
        assert!(!f.intersects_aabb(&beside));
        assert!(f.intersects_aabb(&Aabb::new(Vec3::splat(-0.5) - Vec3::Z * 10.0, Vec3::splat(0.5) - Vec3::Z * 10.0)));
    }

    #[test]
    fn test_portal_wider_than_view_clips_to_camera_frustum() {
        let mut m = manager();
        let v = view();
        let id = m.clip_portal(&portal(1, 100.0, -5.0), None, &v).unwrap();
        let f = m.get(id).unwrap();

        // 60 degree vertical fov, square aspect
        let edge = (30.0f32).to_radians().tan() * 5.0;
        assert_eq!(f.vertices.len(), 4);
        for vertex in &f.vertices {
            assert!((vertex.x.abs() - edge).abs() < 1e-3, "{vertex}");
            assert!((vertex.y.abs() - edge).abs() < 1e-3, "{vertex}");
            assert!((vertex.z + 5.0).abs() < 1e-4);
        }

        // Each edge plane is one of the camera's side planes
        assert_eq!(f.planes.len(), 4);
        let sides = &v.frustum.planes[2..];
        for plane in &f.planes {
            assert!(
                sides.iter().any(|side| side.normal.abs_diff_eq(plane.normal, 1e-3)
                    && (side.distance - plane.distance).abs() < 1e-3),
                "{plane:?} matches no side plane"
            );
        }
    }

    #[test]
    fn test_handles_from_previous_frame_do_not_resolve() {
        let mut m = manager();
        let v = view();
        let old = m.clip_portal(&portal(1, 1.0, -5.0), None, &v).unwrap();

        m.reset();
        let new = m.clip_portal(&portal(3, 1.0, -5.0), None, &v).unwrap();
        assert!(m.get(old).is_none());
        assert_eq!(m.get(new).map(|f| f.room), Some(RoomId(3)));
        assert_eq!(m.children(old).count(), 0);

        // A stale parent clips nothing and records nothing
        let inner = Portal::new(RoomId(1), RoomId(2), portal(2, 10.0, -10.0).vertices, Vec3::ZERO).unwrap();
        assert!(m.clip_portal(&inner, Some(old), &v).is_none());
        assert_eq!(m.len(), 1);
        assert_eq!(m.active_frustums(RoomId(2)), 0);
    }

    #[test]
    fn test_clip_behind_camera_rejected() {
        let mut m = manager();
        // Portal behind the camera, still facing it
        let vertices = vec![
            Vec3::new(-1.0, -1.0, 5.0),
            Vec3::new(1.0, -1.0, 5.0),
            Vec3::new(1.0, 1.0, 5.0),
            Vec3::new(-1.0, 1.0, 5.0),
        ];
        let p = Portal::new(RoomId(0), RoomId(1), vertices, Vec3::ZERO).unwrap();
        assert!(m.clip_portal(&p, None, &view()).is_none());
        assert_eq!(m.active_frustums(RoomId(1)), 0);
        assert!(m.is_empty());
        assert_eq!(m.rejected(), 1);
    }

    #[test]
    fn test_facing_away_rejected() {
        let mut m = manager();
        // Source room on the far side: the camera sees the portal's back
        let p = Portal::new(RoomId(0), RoomId(1), portal(1, 1.0, -5.0).vertices, Vec3::new(0.0, 0.0, -10.0)).unwrap();
        assert!(m.clip_portal(&p, None, &view()).is_none());
    }

    #[test]
    fn test_child_is_subset_of_parent() {
        let mut m = manager();
        let v = view();
        let outer = m.clip_portal(&portal(1, 1.0, -5.0), None, &v).unwrap();
        // Larger portal further away: clipped down to the outer opening
        let inner_portal = Portal::new(RoomId(1), RoomId(2), portal(2, 10.0, -10.0).vertices, Vec3::ZERO).unwrap();
        let inner = m.clip_portal(&inner_portal, Some(outer), &v).unwrap();

        let outer_f = m.get(outer).unwrap();
        let inner_f = m.get(inner).unwrap();
        assert_eq!(inner_f.parent, Some(outer));
        assert_eq!(inner_f.depth, 2);
        for vertex in &inner_f.vertices {
            assert!(vertex.x.abs() <= 2.0 + 1e-4 && vertex.y.abs() <= 2.0 + 1e-4);
            for plane in &outer_f.planes {
                assert!(plane.distance_to_point(*vertex) > -1e-4);
            }
        }
        let children: Vec<FrustumId> = m.children(outer).map(|(id, _)| id).collect();
        assert_eq!(children, vec![inner]);
    }

    #[test]
    fn test_disjoint_child_rejected() {
        let mut m = manager();
        let v = view();
        let outer = m.clip_portal(&portal(1, 1.0, -5.0), None, &v).unwrap();
        // Off to the side of the first opening
        let vertices = vec![
            Vec3::new(8.0, -1.0, -10.0),
            Vec3::new(10.0, -1.0, -10.0),
            Vec3::new(10.0, 1.0, -10.0),
            Vec3::new(8.0, 1.0, -10.0),
        ];
        let side = Portal::new(RoomId(1), RoomId(2), vertices, Vec3::ZERO).unwrap();
        assert!(m.clip_portal(&side, Some(outer), &v).is_none());
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_room_chain_and_reset() {
        let mut m = manager();
        let v = view();
        let a = m.clip_portal(&portal(3, 1.0, -5.0), None, &v).unwrap();
        let b = m.clip_portal(&portal(3, 0.5, -6.0), None, &v).unwrap();
        let chain: Vec<FrustumId> = m.room_frustums(RoomId(3)).map(|(id, _)| id).collect();
        assert_eq!(chain, vec![a, b]);
        assert_eq!(m.active_frustums(RoomId(3)), 2);

        m.reset();
        assert!(m.is_empty());
        assert_eq!(m.room_frustums(RoomId(3)).count(), 0);
        assert!(m.get(a).is_none());
    }

    #[test]
    fn test_capacity_exhausted() {
        let mut m = FrustumManager::new(1);
        m.set_room_count(2);
        let v = view();
        assert!(m.clip_portal(&portal(1, 1.0, -5.0), None, &v).is_some());
        assert!(m.clip_portal(&portal(1, 1.0, -5.0), None, &v).is_none());
        assert_eq!(m.dropped(), 1);
        assert_eq!(m.active_frustums(RoomId(1)), 1);
    }

    #[test]
    fn test_obb_visibility_in_room() {
        let mut m = manager();
        let v = view();
        m.clip_portal(&portal(1, 1.0, -5.0), None, &v).unwrap();
        let unit = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        let through = Obb::from_aabb(&unit, &glam::Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)));
        let beside = Obb::from_aabb(&unit, &glam::Mat4::from_translation(Vec3::new(6.0, 0.0, -10.0)));
        assert!(m.is_obb_visible_in_room(RoomId(1), &through, &v));
        assert!(!m.is_obb_visible_in_room(RoomId(1), &beside, &v));
        // Room 2 has no chain: the whole camera frustum applies
        assert!(m.is_obb_visible_in_room(RoomId(2), &beside, &v));
    }
}
