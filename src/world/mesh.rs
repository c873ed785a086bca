//! Mesh data consumed by the transparency pass
//!
//! Only the transparent polygon set is kept here; opaque geometry is owned and
//! uploaded by the rasterization layer.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::core::types::Result;
use crate::core::Error;
use crate::math::polygon::{self, ClipVertex};
use crate::math::{Aabb, Obb};

/// Unique identifier for a mesh in the [`World`](super::World).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// A single mesh vertex with every attribute the transparent pass emits
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec4,
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

impl Vertex {
    /// White, untextured vertex at `position`
    pub fn at(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            color: Vec4::ONE,
            normal,
            tex_coord: Vec2::ZERO,
        }
    }

    /// Apply a model transform to position and normal
    pub fn transformed(&self, transform: &Mat4) -> Self {
        Self {
            position: transform.transform_point3(self.position),
            normal: transform.transform_vector3(self.normal).normalize_or_zero(),
            ..*self
        }
    }
}

impl ClipVertex for Vertex {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            color: self.color.lerp(other.color, t),
            normal: self.normal.lerp(other.normal, t).normalize_or_zero(),
            tex_coord: self.tex_coord.lerp(other.tex_coord, t),
        }
    }
}

/// How a polygon is composited over what is already in the framebuffer.
/// Modes past `AlphaTest` need sorted, blended drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BlendMode {
    #[default]
    Opaque,
    AlphaTest,
    /// Additive, classic PC alpha
    Multiply,
    /// Darkening by source colour
    InvertSrc,
    InvertDest,
    /// Smoke, glows
    Screen,
    /// Opaque animated texture, drawn in the sorted pass so UVs can update
    AnimatedTex,
}

impl BlendMode {
    /// Whether polygons with this mode go through the sorted transparent pass
    pub fn is_transparent(self) -> bool {
        !matches!(self, BlendMode::Opaque | BlendMode::AlphaTest)
    }
}

/// Binding of a polygon to an animated texture sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolygonAnim {
    /// Index into `World::anim_sequences`
    pub sequence: usize,
    /// Frame offset so neighbouring polygons can run out of phase
    pub frame_offset: usize,
}

/// A convex polygon drawn as a triangle fan
#[derive(Clone, Debug, PartialEq)]
pub struct TexturedPolygon {
    pub vertices: Vec<Vertex>,
    pub blend_mode: BlendMode,
    pub texture: u32,
    pub anim: Option<PolygonAnim>,
}

impl TexturedPolygon {
    pub fn new(vertices: Vec<Vertex>, blend_mode: BlendMode, texture: u32) -> Self {
        Self {
            vertices,
            blend_mode,
            texture,
            anim: None,
        }
    }

    /// Build a polygon from bare positions; the normal is taken from the winding
    pub fn from_positions(positions: &[Vec3], blend_mode: BlendMode, texture: u32) -> Self {
        let normal = polygon::newell_normal(positions).normalize_or_zero();
        let vertices = positions.iter().map(|&p| Vertex::at(p, normal)).collect();
        Self::new(vertices, blend_mode, texture)
    }

    pub fn with_anim(mut self, anim: PolygonAnim) -> Self {
        self.anim = Some(anim);
        self
    }
}

/// Geometry shared by rooms, static meshes and entity bones
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    /// Polygons that must be depth-sorted before drawing
    pub transparent_polygons: Vec<TexturedPolygon>,
}

impl Mesh {
    /// Create a mesh, keeping only polygons whose blend mode needs sorting.
    ///
    /// Fails on polygons with fewer than 3 vertices or no area.
    pub fn new(polygons: Vec<TexturedPolygon>) -> Result<Self> {
        for (i, p) in polygons.iter().enumerate() {
            if polygon::polygon_plane(&p.vertices).is_none() {
                return Err(Error::InvalidMesh(format!(
                    "polygon {i} is degenerate ({} vertices)",
                    p.vertices.len()
                )));
            }
        }

        Ok(Self {
            transparent_polygons: polygons
                .into_iter()
                .filter(|p| p.blend_mode.is_transparent())
                .collect(),
        })
    }

    pub fn has_transparency(&self) -> bool {
        !self.transparent_polygons.is_empty()
    }
}

/// A static mesh placed in a room
#[derive(Clone, Debug)]
pub struct StaticMesh {
    pub mesh: MeshId,
    pub transform: Mat4,
    /// Local-space visibility box
    pub bounds: Aabb,
    /// Dummy/collision-only statics are skipped unless explicitly requested
    pub hidden: bool,
}

impl StaticMesh {
    pub fn new(mesh: MeshId, transform: Mat4, bounds: Aabb) -> Self {
        Self {
            mesh,
            transform,
            bounds,
            hidden: false,
        }
    }

    /// World-space oriented box
    pub fn obb(&self) -> Obb {
        Obb::from_aabb(&self.bounds, &self.transform)
    }
}
