//! Convex polygon clipping and splitting
//!
//! Sutherland–Hodgman style routines shared by portal clipping (bare
//! positions) and the transparency BSP (full vertices with attributes).

use crate::core::types::Vec3;
use super::frustum::Plane;

/// Distance below which a vertex counts as lying on a plane
pub const SPLIT_EPSILON: f32 = 0.02;

/// Which side of a plane a point or polygon lies on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneSide {
    Front,
    Back,
    OnPlane,
    Spanning,
}

/// A vertex that can be clipped: exposes its position and can blend
/// every attribute it carries.
pub trait ClipVertex: Copy {
    fn position(&self) -> Vec3;

    /// Attribute-wise interpolation, `t = 0` gives `self`
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl ClipVertex for Vec3 {
    fn position(&self) -> Vec3 {
        *self
    }

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec3::lerp(*self, *other, t)
    }
}

/// Classify a vertex ring against a plane
pub fn classify<V: ClipVertex>(vertices: &[V], plane: &Plane, epsilon: f32) -> PlaneSide {
    let mut front = 0;
    let mut back = 0;
    for v in vertices {
        let d = plane.distance_to_point(v.position());
        if d > epsilon {
            front += 1;
        } else if d < -epsilon {
            back += 1;
        }
    }
    match (front, back) {
        (0, 0) => PlaneSide::OnPlane,
        (_, 0) => PlaneSide::Front,
        (0, _) => PlaneSide::Back,
        _ => PlaneSide::Spanning,
    }
}

/// Keep the part of `input` on the positive side of `plane`, writing the
/// result to `output` (cleared first). Winding is preserved.
pub fn clip_polygon<V: ClipVertex>(input: &[V], plane: &Plane, output: &mut Vec<V>) {
    output.clear();
    let Some(mut prev) = input.last() else {
        return;
    };
    let mut prev_dist = plane.distance_to_point(prev.position());

    for cur in input {
        let cur_dist = plane.distance_to_point(cur.position());
        let cur_inside = cur_dist >= 0.0;
        let prev_inside = prev_dist >= 0.0;

        if cur_inside != prev_inside {
            let t = prev_dist / (prev_dist - cur_dist);
            output.push(prev.lerp(cur, t));
        }
        if cur_inside {
            output.push(*cur);
        }

        prev = cur;
        prev_dist = cur_dist;
    }
}

/// Clip `polygon` in place against every plane, keeping the intersection.
/// `scratch` is reused between calls to avoid per-plane allocations.
/// Returns false once fewer than 3 vertices remain.
pub fn clip_polygon_by_planes<V: ClipVertex>(
    polygon: &mut Vec<V>,
    planes: &[Plane],
    scratch: &mut Vec<V>,
) -> bool {
    for plane in planes {
        if polygon.len() < 3 {
            break;
        }
        clip_polygon(polygon, plane, scratch);
        std::mem::swap(polygon, scratch);
    }
    polygon.len() >= 3
}

/// Split a spanning polygon into front and back fragments. Vertices within
/// `epsilon` of the plane go to both fragments. Fragments with fewer than 3
/// vertices are returned empty.
pub fn split_polygon<V: ClipVertex>(
    input: &[V],
    plane: &Plane,
    epsilon: f32,
    front: &mut Vec<V>,
    back: &mut Vec<V>,
) {
    front.clear();
    back.clear();
    let n = input.len();

    for i in 0..n {
        let j = (i + 1) % n;
        let vi = &input[i];
        let vj = &input[j];
        let di = plane.distance_to_point(vi.position());
        let dj = plane.distance_to_point(vj.position());

        if di >= -epsilon {
            front.push(*vi);
        }
        if di <= epsilon {
            back.push(*vi);
        }

        // Edge strictly crosses the plane
        if (di > epsilon && dj < -epsilon) || (di < -epsilon && dj > epsilon) {
            let t = di / (di - dj);
            let v = vi.lerp(vj, t);
            front.push(v);
            back.push(v);
        }
    }

    if front.len() < 3 {
        front.clear();
    }
    if back.len() < 3 {
        back.clear();
    }
}

/// Area-weighted polygon normal (Newell's method), not normalized
pub fn newell_normal<V: ClipVertex>(vertices: &[V]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    let n = vertices.len();
    for i in 0..n {
        let a = vertices[i].position();
        let b = vertices[(i + 1) % n].position();
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Plane of a polygon, `None` when it has no area
pub fn polygon_plane<V: ClipVertex>(vertices: &[V]) -> Option<Plane> {
    if vertices.len() < 3 {
        return None;
    }
    let normal = newell_normal(vertices);
    if normal.length_squared() <= 1e-12 {
        return None;
    }
    Some(Plane::from_point_normal(centroid(vertices), normal))
}

/// Average of the vertex positions
pub fn centroid<V: ClipVertex>(vertices: &[V]) -> Vec3 {
    if vertices.is_empty() {
        return Vec3::ZERO;
    }
    vertices.iter().map(|v| v.position()).sum::<Vec3>() / vertices.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec3> {
        vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_clip_keeps_half() {
        let mut out = Vec::new();
        clip_polygon(&square(), &Plane::new(Vec3::X, 0.0), &mut out);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|p| p.x >= -1e-6));
    }

    #[test]
    fn test_clip_fully_outside() {
        let mut out = Vec::new();
        clip_polygon(&square(), &Plane::new(Vec3::X, -5.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_clip_by_planes_degenerates() {
        let mut poly = square();
        let mut scratch = Vec::new();
        let planes = [Plane::new(Vec3::X, 0.0), Plane::new(-Vec3::X, -0.5)];
        assert!(!clip_polygon_by_planes(&mut poly, &planes, &mut scratch));
    }

    #[test]
    fn test_split_reconstructs_boundary() {
        let plane = Plane::new(Vec3::X, 0.0);
        let (mut front, mut back) = (Vec::new(), Vec::new());
        split_polygon(&square(), &plane, SPLIT_EPSILON, &mut front, &mut back);
        assert_eq!(front.len(), 4);
        assert_eq!(back.len(), 4);

        // Every original corner survives in exactly one fragment
        for corner in square() {
            let in_front = front.contains(&corner);
            let in_back = back.contains(&corner);
            assert!(in_front ^ in_back);
        }
        // Both fragments keep the original facing
        let n = newell_normal(&square()).normalize();
        assert!(newell_normal(&front).normalize().abs_diff_eq(n, 1e-5));
        assert!(newell_normal(&back).normalize().abs_diff_eq(n, 1e-5));
    }

    #[test]
    fn test_classify() {
        let poly = square();
        assert_eq!(classify(&poly, &Plane::new(Vec3::Z, 0.0), SPLIT_EPSILON), PlaneSide::OnPlane);
        assert_eq!(classify(&poly, &Plane::new(Vec3::X, 5.0), SPLIT_EPSILON), PlaneSide::Front);
        assert_eq!(classify(&poly, &Plane::new(Vec3::X, -5.0), SPLIT_EPSILON), PlaneSide::Back);
        assert_eq!(classify(&poly, &Plane::new(Vec3::X, 0.0), SPLIT_EPSILON), PlaneSide::Spanning);
    }

    #[test]
    fn test_polygon_plane() {
        let plane = polygon_plane(&square()).unwrap();
        assert!(plane.normal.abs_diff_eq(Vec3::Z, 1e-6));
        assert!(plane.distance.abs() < 1e-6);
        assert!(polygon_plane(&square()[..2]).is_none());
    }
}
