//! Per-frame visibility and transparency pipeline

pub mod arena;
pub mod frustum;
pub mod render_list;
pub mod visibility;
pub mod bsp;
pub mod config;
pub mod stats;
pub mod renderer;

pub use arena::{FrameArena, Recycle};
pub use bsp::{DrawBatch, DrawCommand, DrawOrder, DynamicBsp, GpuVertex};
pub use config::RenderSettings;
pub use frustum::{CameraView, Frustum, FrustumId, FrustumManager, MAX_FRUSTUM_VERTICES};
pub use render_list::{RenderList, RenderListEntry};
pub use renderer::{Renderer, VisibleObjects};
pub use stats::FrameStats;
