//! Portalvis - room/portal visibility and transparency sorting
//!
//! Given a camera and a level built from rooms joined by portals, each frame
//! this crate finds the rooms that can be seen, the clipped frustums they are
//! seen through, and a back-to-front sequence of every visible transparent
//! polygon.

pub mod core;
pub mod math;
pub mod world;
pub mod render;
