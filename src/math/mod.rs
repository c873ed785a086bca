//! Mathematical utilities and data structures

pub mod aabb;
pub mod obb;
pub mod frustum;
pub mod polygon;

pub use aabb::Aabb;
pub use obb::Obb;
pub use frustum::{Plane, ViewFrustum};
pub use polygon::{ClipVertex, PlaneSide, SPLIT_EPSILON};
