//! Per-frame BSP tree for sorting transparent polygons
//!
//! The tree is rebuilt from scratch every frame out of whatever transparent
//! geometry survived visibility. Each node takes its splitting plane from the
//! first polygon that reaches it. Polygons entirely on one side of a node's
//! plane stay in that node's front or back list; only straddling polygons are
//! split, and their fragments go down into lazily created children.
//!
//! Traversal relative to the camera yields a strict back-to-front (or
//! front-to-back) sequence of triangle fans, written as interleaved vertices
//! plus one [`DrawCommand`] per polygon.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::math::polygon::{self, PlaneSide, SPLIT_EPSILON};
use crate::math::Plane;
use crate::world::{AnimSequence, BlendMode, TexturedPolygon, Vertex};

use slotmap::new_key_type;

use super::arena::{FrameArena, Recycle};

new_key_type! {
    /// Frame-local handle to a [`BspNode`]
    pub struct BspNodeId;
    /// Frame-local handle to a [`BspPolygon`]
    pub struct BspPolygonId;
}

/// Intrusive singly-linked list of polygons with O(1) append
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PolygonList {
    head: Option<BspPolygonId>,
    tail: Option<BspPolygonId>,
    len: u32,
}

impl PolygonList {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A polygon stored in the tree, already in world space
#[derive(Clone, Debug, Default)]
pub struct BspPolygon {
    pub vertices: Vec<Vertex>,
    pub blend_mode: BlendMode,
    pub texture: u32,
    pub plane: Plane,
    pub centroid: Vec3,
    next: Option<BspPolygonId>,
}

impl Recycle for BspPolygon {
    fn recycle(&mut self) {
        self.vertices.clear();
        self.blend_mode = BlendMode::default();
        self.texture = 0;
        self.plane = Plane::default();
        self.centroid = Vec3::ZERO;
        self.next = None;
    }
}

/// One node of the tree. `plane` is `None` only for the empty root.
#[derive(Clone, Copy, Debug, Default)]
pub struct BspNode {
    pub plane: Option<Plane>,
    pub front_list: PolygonList,
    pub back_list: PolygonList,
    pub front: Option<BspNodeId>,
    pub back: Option<BspNodeId>,
}

impl Recycle for BspNode {
    fn recycle(&mut self) {
        *self = Self::default();
    }
}

/// Interleaved vertex as uploaded for the transparent pass (48 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl From<&Vertex> for GpuVertex {
    fn from(v: &Vertex) -> Self {
        Self {
            position: v.position.to_array(),
            color: v.color.to_array(),
            normal: v.normal.to_array(),
            tex_coord: v.tex_coord.to_array(),
        }
    }
}

/// A single polygon to draw as a triangle fan
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCommand {
    pub blend_mode: BlendMode,
    pub texture: u32,
    pub first_vertex: u32,
    pub vertex_count: u32,
}

impl DrawCommand {
    /// Triangle-list indices for this fan, relative to the vertex buffer start
    pub fn fan_triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let base = self.first_vertex;
        (1..self.vertex_count.saturating_sub(1)).map(move |i| [base, base + i, base + i + 1])
    }
}

/// A run of adjacent commands sharing blend mode and texture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawBatch {
    pub blend_mode: BlendMode,
    pub texture: u32,
    pub first_command: u32,
    pub command_count: u32,
}

/// Traversal direction relative to the camera
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DrawOrder {
    /// Farthest first, for alpha blending
    #[default]
    BackToFront,
    FrontToBack,
}

/// Per-frame tree statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BspStats {
    pub nodes: u32,
    pub polygons: u32,
    /// Polygons cut in two by a node plane
    pub splits: u32,
    /// Polygons entirely outside the clip planes
    pub clipped: u32,
    /// Polygons or fragments lost to full arenas
    pub dropped: u32,
}

enum Visit {
    Node(BspNodeId),
    List(PolygonList),
}

/// Frame-rebuilt BSP over transparent polygons
pub struct DynamicBsp {
    nodes: FrameArena<BspNodeId, BspNode>,
    polygons: FrameArena<BspPolygonId, BspPolygon>,
    root: Option<BspNodeId>,
    anim: Vec<AnimSequence>,
    vertices: Vec<GpuVertex>,
    commands: Vec<DrawCommand>,
    batches: Vec<DrawBatch>,
    stats: BspStats,
    // Reused scratch buffers
    clip: Vec<Vertex>,
    scratch: Vec<Vertex>,
    front_frag: Vec<Vertex>,
    back_frag: Vec<Vertex>,
    pending: Vec<(BspNodeId, BspPolygonId)>,
    visit: Vec<Visit>,
    sorted: Vec<BspPolygonId>,
}

impl DynamicBsp {
    pub fn new(max_nodes: usize, max_polygons: usize) -> Self {
        let mut bsp = Self {
            nodes: FrameArena::with_capacity(max_nodes),
            polygons: FrameArena::with_capacity(max_polygons),
            root: None,
            anim: Vec::new(),
            vertices: Vec::new(),
            commands: Vec::new(),
            batches: Vec::new(),
            stats: BspStats::default(),
            clip: Vec::new(),
            scratch: Vec::new(),
            front_frag: Vec::new(),
            back_frag: Vec::new(),
            pending: Vec::new(),
            visit: Vec::new(),
            sorted: Vec::new(),
        };
        bsp.reset(&[]);
        bsp
    }

    /// Discard the previous frame's tree and output, and capture the
    /// current state of the animated texture sequences.
    pub fn reset(&mut self, anim_sequences: &[AnimSequence]) {
        self.nodes.reset();
        self.polygons.reset();
        self.root = self.nodes.alloc().map(|(id, _)| id);
        self.anim.clear();
        self.anim.extend_from_slice(anim_sequences);
        self.vertices.clear();
        self.commands.clear();
        self.batches.clear();
        self.stats = BspStats::default();
    }

    /// Transform `polygons` by `transform`, clip them against `clip_planes`
    /// and insert what remains into the tree.
    pub fn insert_polygons(&mut self, polygons: &[TexturedPolygon], transform: &Mat4, clip_planes: &[Plane]) {
        for source in polygons {
            self.clip.clear();
            self.clip.extend(source.vertices.iter().map(|v| v.transformed(transform)));
            let texture = self.resolve_animation(source);

            if !polygon::clip_polygon_by_planes(&mut self.clip, clip_planes, &mut self.scratch) {
                self.stats.clipped += 1;
                continue;
            }
            let Some(plane) = polygon::polygon_plane(&self.clip) else {
                continue;
            };
            let Some(id) = self.alloc_polygon(source.blend_mode, texture, plane) else {
                continue;
            };
            let Some(root) = self.root else {
                self.stats.dropped += 1;
                continue;
            };
            self.pending.push((root, id));
            self.drain_pending();
        }
    }

    /// Apply the bound animation frame to the vertices in `self.clip` and
    /// return the texture to draw with.
    fn resolve_animation(&mut self, source: &TexturedPolygon) -> u32 {
        let Some(binding) = source.anim else {
            return source.texture;
        };
        let Some(sequence) = self.anim.get(binding.sequence) else {
            return source.texture;
        };
        let Some(frame) = sequence.frame(binding.frame_offset) else {
            return source.texture;
        };
        let scroll = if sequence.uv_rotate { frame.current_uv_rotate } else { 0.0 };
        for v in &mut self.clip {
            v.tex_coord = frame.apply(v.tex_coord);
            v.tex_coord.y += scroll;
        }
        frame.texture
    }

    /// Store `self.clip` as a new polygon
    fn alloc_polygon(&mut self, blend_mode: BlendMode, texture: u32, plane: Plane) -> Option<BspPolygonId> {
        let Some((id, slot)) = self.polygons.alloc() else {
            self.stats.dropped += 1;
            return None;
        };
        slot.vertices.extend_from_slice(&self.clip);
        slot.blend_mode = blend_mode;
        slot.texture = texture;
        slot.plane = plane;
        slot.centroid = polygon::centroid(&self.clip);
        Some(id)
    }

    fn drain_pending(&mut self) {
        while let Some((node_id, poly_id)) = self.pending.pop() {
            self.insert(node_id, poly_id);
        }
    }

    fn insert(&mut self, node_id: BspNodeId, poly_id: BspPolygonId) {
        let Some(node) = self.nodes.get(node_id).copied() else {
            return;
        };
        let Some(poly) = self.polygons.get(poly_id) else {
            return;
        };

        let Some(plane) = node.plane else {
            // Empty node: this polygon becomes the splitter
            let plane = poly.plane;
            if let Some(node) = self.nodes.get_mut(node_id) {
                node.plane = Some(plane);
            }
            self.append(node_id, poly_id, true);
            return;
        };

        match polygon::classify(&poly.vertices, &plane, SPLIT_EPSILON) {
            PlaneSide::Front => self.append(node_id, poly_id, true),
            PlaneSide::Back => self.append(node_id, poly_id, false),
            PlaneSide::OnPlane => {
                let same_facing = poly.plane.normal.dot(plane.normal) >= 0.0;
                self.append(node_id, poly_id, same_facing);
            }
            PlaneSide::Spanning => self.split(node_id, poly_id, plane),
        }
    }

    fn split(&mut self, node_id: BspNodeId, poly_id: BspPolygonId, plane: Plane) {
        let Some(poly) = self.polygons.get(poly_id) else {
            return;
        };
        polygon::split_polygon(&poly.vertices, &plane, SPLIT_EPSILON, &mut self.front_frag, &mut self.back_frag);
        let (blend_mode, texture, poly_plane) = (poly.blend_mode, poly.texture, poly.plane);
        self.stats.splits += 1;

        // The front fragment reuses the original slot
        let mut fragments: [Option<BspPolygonId>; 2] = [None, None];
        if !self.front_frag.is_empty() {
            if let Some(slot) = self.polygons.get_mut(poly_id) {
                slot.vertices.clear();
                slot.vertices.extend_from_slice(&self.front_frag);
                slot.centroid = polygon::centroid(&self.front_frag);
            }
            fragments[0] = Some(poly_id);
        }
        if !self.back_frag.is_empty() {
            std::mem::swap(&mut self.clip, &mut self.back_frag);
            fragments[1] = self.alloc_polygon(blend_mode, texture, poly_plane);
            std::mem::swap(&mut self.clip, &mut self.back_frag);
        }

        for (fragment, front) in fragments.into_iter().zip([true, false]) {
            let Some(fragment) = fragment else {
                continue;
            };
            match self.child(node_id, front) {
                Some(child) => self.pending.push((child, fragment)),
                None => self.stats.dropped += 1,
            }
        }
    }

    /// Existing child on one side of a node, created on first use
    fn child(&mut self, node_id: BspNodeId, front: bool) -> Option<BspNodeId> {
        let node = self.nodes.get(node_id)?;
        let existing = if front { node.front } else { node.back };
        if existing.is_some() {
            return existing;
        }
        let (child, _) = self.nodes.alloc()?;
        let node = self.nodes.get_mut(node_id)?;
        if front {
            node.front = Some(child);
        } else {
            node.back = Some(child);
        }
        Some(child)
    }

    fn append(&mut self, node_id: BspNodeId, poly_id: BspPolygonId, front: bool) {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return;
        };
        let list = if front { &mut node.front_list } else { &mut node.back_list };
        let prev_tail = list.tail.replace(poly_id);
        if list.head.is_none() {
            list.head = Some(poly_id);
        }
        list.len += 1;
        if let Some(prev) = prev_tail.and_then(|t| self.polygons.get_mut(t)) {
            prev.next = Some(poly_id);
        }
    }

    /// Walk the tree from `eye` and rebuild the vertex and command output.
    ///
    /// At each node the side holding the camera (`d >= 0` counts as front)
    /// is the near side. Back-to-front emits far child, far list, near list,
    /// near child; front-to-back is the exact reverse. Polygons sharing a
    /// list are ordered by centroid distance, ties in insertion order.
    pub fn traverse(&mut self, eye: Vec3, order: DrawOrder) {
        self.vertices.clear();
        self.commands.clear();
        self.batches.clear();
        self.visit.clear();
        if let Some(root) = self.root {
            self.visit.push(Visit::Node(root));
        }

        while let Some(visit) = self.visit.pop() {
            match visit {
                Visit::List(list) => self.emit_list(list, eye, order),
                Visit::Node(id) => {
                    let Some(node) = self.nodes.get(id).copied() else {
                        continue;
                    };
                    let Some(plane) = node.plane else {
                        continue;
                    };
                    let in_front = plane.distance_to_point(eye) >= 0.0;
                    let (near, near_list, far, far_list) = if in_front {
                        (node.front, node.front_list, node.back, node.back_list)
                    } else {
                        (node.back, node.back_list, node.front, node.front_list)
                    };
                    let mut steps = [
                        far.map(Visit::Node),
                        Some(Visit::List(far_list)),
                        Some(Visit::List(near_list)),
                        near.map(Visit::Node),
                    ];
                    if order == DrawOrder::FrontToBack {
                        steps.reverse();
                    }
                    // Stack: push last step first
                    self.visit.extend(steps.into_iter().rev().flatten());
                }
            }
        }

        self.build_batches();
    }

    fn emit_list(&mut self, list: PolygonList, eye: Vec3, order: DrawOrder) {
        self.sorted.clear();
        let mut next = list.head;
        while let Some(id) = next {
            self.sorted.push(id);
            next = self.polygons.get(id).and_then(|p| p.next);
        }

        let polygons = &self.polygons;
        let distance = |id: &BspPolygonId| {
            polygons
                .get(*id)
                .map_or(0.0, |p| p.centroid.distance_squared(eye))
        };
        // Stable, so equal distances keep insertion order
        self.sorted.sort_by(|a, b| {
            let ordering = distance(b).partial_cmp(&distance(a)).unwrap_or(std::cmp::Ordering::Equal);
            match order {
                DrawOrder::BackToFront => ordering,
                DrawOrder::FrontToBack => ordering.reverse(),
            }
        });

        for id in &self.sorted {
            let Some(poly) = self.polygons.get(*id) else {
                continue;
            };
            let first_vertex = self.vertices.len() as u32;
            self.vertices.extend(poly.vertices.iter().map(GpuVertex::from));
            self.commands.push(DrawCommand {
                blend_mode: poly.blend_mode,
                texture: poly.texture,
                first_vertex,
                vertex_count: poly.vertices.len() as u32,
            });
        }
    }

    /// Merge runs of adjacent commands with identical state. Never reorders.
    fn build_batches(&mut self) {
        self.batches.clear();
        for (i, cmd) in self.commands.iter().enumerate() {
            match self.batches.last_mut() {
                Some(batch) if batch.blend_mode == cmd.blend_mode && batch.texture == cmd.texture => {
                    batch.command_count += 1;
                }
                _ => self.batches.push(DrawBatch {
                    blend_mode: cmd.blend_mode,
                    texture: cmd.texture,
                    first_command: i as u32,
                    command_count: 1,
                }),
            }
        }
    }

    /// Vertices in draw order, valid after [`traverse`](Self::traverse)
    pub fn vertices(&self) -> &[GpuVertex] {
        &self.vertices
    }

    /// Raw bytes of [`vertices`](Self::vertices) for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    /// Commands covered by one batch
    pub fn batch_commands(&self, batch: &DrawBatch) -> &[DrawCommand] {
        let start = batch.first_command as usize;
        let end = start + batch.command_count as usize;
        self.commands.get(start..end).unwrap_or(&[])
    }

    pub fn root(&self) -> Option<BspNodeId> {
        self.root
    }

    pub fn node(&self, id: BspNodeId) -> Option<&BspNode> {
        self.nodes.get(id)
    }

    pub fn polygon(&self, id: BspPolygonId) -> Option<&BspPolygon> {
        self.polygons.get(id)
    }

    /// Polygons of a node list in insertion order
    pub fn list_polygons(&self, list: PolygonList) -> impl Iterator<Item = &BspPolygon> + '_ {
        let mut next = list.head;
        std::iter::from_fn(move || {
            let poly = self.polygons.get(next?)?;
            next = poly.next;
            Some(poly)
        })
    }

    /// True when nothing was inserted since the last reset
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn stats(&self) -> BspStats {
        BspStats {
            nodes: self.nodes.len() as u32,
            polygons: self.polygons.len() as u32,
            ..self.stats
        }
    }
}
